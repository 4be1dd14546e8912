//! `ConversionReview` handling for the CRD conversion webhook.
//!
//! The API server posts a review holding objects of one revision and the
//! revision it wants back. Either every object converts or the review fails as a
//! whole.

use crate::conversion::convert_object;
use kube::core::Status;
use kube::core::conversion::{ConversionRequest, ConversionResponse, ConversionReview};

/// Reason reported when a review is rejected.
pub const FAILURE_REASON: &str = "ConversionFailed";

/// Answer a review request.
pub fn review(mut request: ConversionRequest) -> ConversionReview {
    let uid = request.uid.clone();
    let desired = request.desired_api_version.clone();
    let objects = std::mem::take(&mut request.objects);
    let response = ConversionResponse::for_request(request);

    let converted = objects
        .into_iter()
        .map(|object| convert_object(object, &desired))
        .collect::<Result<Vec<_>, _>>();

    match converted {
        Ok(objects) => {
            tracing::info!(uid = %uid, desired = %desired, count = objects.len(), "Converted objects");
            response.success(objects).into_review()
        }
        Err(e) => {
            tracing::warn!(uid = %uid, desired = %desired, error = %e, "Conversion rejected");
            response
                .failure(Status::failure(&e.to_string(), FAILURE_REASON))
                .into_review()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn alpha(name: &str) -> Value {
        json!({
            "apiVersion": "hawt.io/v1alpha1",
            "kind": "Hawtio",
            "metadata": { "name": name, "namespace": "hawtio" },
            "spec": { "type": "Namespace", "version": "1.12" }
        })
    }

    fn request(desired: &str, objects: Vec<Value>) -> ConversionRequest {
        let review: ConversionReview = serde_json::from_value(json!({
            "apiVersion": "apiextensions.k8s.io/v1",
            "kind": "ConversionReview",
            "request": {
                "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
                "desiredAPIVersion": desired,
                "objects": objects
            }
        }))
        .unwrap();
        ConversionRequest::from_review(review).unwrap()
    }

    #[test]
    fn upgrades_every_object_in_order() {
        let review = review(request("hawt.io/v1", vec![alpha("a"), alpha("b")]));
        let response = review.response.unwrap();

        assert!(response.result.is_success());
        assert_eq!(response.uid, "705ab4f5-6393-11e8-b7cc-42010a800002");
        assert_eq!(response.converted_objects.len(), 2);
        assert_eq!(response.converted_objects[0]["metadata"]["name"], "a");
        assert_eq!(response.converted_objects[1]["metadata"]["name"], "b");
        assert_eq!(response.converted_objects[0]["apiVersion"], "hawt.io/v1");
        assert!(response.converted_objects[0]["spec"].get("version").is_none());
    }

    #[test]
    fn one_bad_object_fails_the_whole_review() {
        let hub = json!({
            "apiVersion": "hawt.io/v1",
            "kind": "Hawtio",
            "metadata": { "name": "c", "namespace": "hawtio" },
            "spec": {}
        });
        let review = review(request("hawt.io/v1alpha1", vec![alpha("a"), hub]));
        let response = review.response.unwrap();

        assert!(response.result.is_failure());
        assert!(response.converted_objects.is_empty());
        assert_eq!(
            response.result.message,
            "Conversion from hawt.io/v1 to hawt.io/v1alpha1 is not supported"
        );
        assert_eq!(response.result.reason, FAILURE_REASON);
    }

    #[test]
    fn review_uses_wire_names() {
        let response = serde_json::to_value(review(request("hawt.io/v1", vec![]))).unwrap();

        assert_eq!(response["apiVersion"], "apiextensions.k8s.io/v1");
        assert_eq!(response["kind"], "ConversionReview");
        assert_eq!(
            response["response"]["uid"],
            "705ab4f5-6393-11e8-b7cc-42010a800002"
        );
        assert_eq!(response["response"]["result"]["status"], "Success");
        assert!(response["response"]["convertedObjects"].as_array().unwrap().is_empty());
        assert!(response.get("request").is_none());
    }
}
