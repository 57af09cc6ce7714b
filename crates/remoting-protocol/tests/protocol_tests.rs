//! Protocol layer tests: envelope serialization, request decoding, error names.

#[cfg(test)]
mod tests {
    use remoting_protocol::*;
    use serde_json::json;

    // ─────────────────────────────────────────────────────────────────────
    // Request decoding
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn request_deserialized_from_wire_format() {
        let wire = r#"{"id":2,"type":"invoke","instance":0,"method":"hello","args":["Ann"]}"#;
        let req = Request::from_text(wire).unwrap();
        assert_eq!(req.id, Some(json!(2)));
        assert_eq!(req.kind.as_deref(), Some("invoke"));
        assert_eq!(req.instance, Some(0));
        assert_eq!(req.method.as_deref(), Some("hello"));
        assert_eq!(req.args, Some(vec![json!("Ann")]));
    }

    #[test]
    fn request_id_is_opaque() {
        let req = Request::from_text(r#"{"id":{"seq":7,"tag":"x"},"type":"services"}"#).unwrap();
        assert_eq!(req.id, Some(json!({"seq": 7, "tag": "x"})));

        let req = Request::from_text(r#"{"id":"req-1","type":"services"}"#).unwrap();
        assert_eq!(req.id, Some(json!("req-1")));
    }

    #[test]
    fn request_null_id_treated_as_missing() {
        let req = Request::from_text(r#"{"id":null,"type":"services"}"#).unwrap();
        assert!(req.id.is_none());
    }

    #[test]
    fn request_without_optional_fields() {
        let req = Request::from_text(r#"{"type":"services"}"#).unwrap();
        assert!(req.id.is_none());
        assert!(req.service.is_none());
        assert!(req.instance.is_none());
        assert!(req.args.is_none());
    }

    #[test]
    fn malformed_json_is_parse_error_without_id() {
        let err = Request::from_text("not json").unwrap_err();
        assert_eq!(err.name, "ParseError");
        assert_eq!(err.kind, ERROR_TYPE);
        assert!(err.id.is_none());
    }

    #[test]
    fn non_object_is_invalid_request() {
        let err = Request::from_text("[1, 2, 3]").unwrap_err();
        assert_eq!(err.name, "InvalidRequest");
        assert!(err.id.is_none());
    }

    #[test]
    fn wrong_field_shape_keeps_id() {
        let err = Request::from_text(r#"{"id":9,"type":"invoke","instance":"zero"}"#).unwrap_err();
        assert_eq!(err.name, "InvalidRequest");
        assert_eq!(err.id, Some(json!(9)));

        let err = Request::from_text(r#"{"id":10,"type":"release","instance":1.5}"#).unwrap_err();
        assert_eq!(err.name, "InvalidRequest");
        assert_eq!(err.id, Some(json!(10)));
    }

    #[test]
    fn negative_instance_decodes_without_a_slot() {
        let req = Request::from_text(r#"{"id":11,"type":"invoke","instance":-1}"#).unwrap();
        assert_eq!(req.instance, Some(-1));
        assert_eq!(req.slot(), None);

        let req = Request::from_text(r#"{"type":"invoke","instance":3}"#).unwrap();
        assert_eq!(req.slot(), Some(3));
    }

    #[test]
    fn request_builder_serialization() {
        let req = Request::new(RequestTypes::INSTANCE).with_id(1).with_service("Greeter");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, json!({"id": 1, "type": "instance", "service": "Greeter"}));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Responses
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn response_echoes_request_id_and_type() {
        let req = Request::new("call").with_id("abc");
        let resp = Response::for_request(&req).with_result(json!("hithere"));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json, json!({"id": "abc", "type": "call", "result": "hithere"}));
    }

    #[test]
    fn bare_response_has_no_result_field() {
        let req = Request::new(RequestTypes::RELEASE).with_id(0);
        let json = serde_json::to_value(Response::for_request(&req)).unwrap();
        assert_eq!(json, json!({"id": 0, "type": "release"}));
        assert!(json.get("result").is_none());
    }

    #[test]
    fn null_result_is_still_sent() {
        let req = Request::new(RequestTypes::INVOKE).with_id(4);
        let json = serde_json::to_value(Response::for_request(&req).with_result(json!(null))).unwrap();
        assert!(json.get("result").is_some());
        assert!(json["result"].is_null());
    }

    #[test]
    fn error_response_field_presence() {
        let json = serde_json::to_value(ErrorResponse::new(
            Some(json!(3)),
            RemotingError::instance_not_found(Some(99)),
        ))
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["name"], "InstanceNotFound");
        assert_eq!(json["id"], 3);
        assert!(json["message"].as_str().unwrap().contains("99"));

        let json = serde_json::to_value(ErrorResponse::new(
            None,
            RemotingError::parse_error("bad").without_message(),
        ))
        .unwrap();
        assert_eq!(json, json!({"type": "error", "name": "ParseError"}));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Errors
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn error_kind_names() {
        assert_eq!(ErrorKind::ParseError.name(), "ParseError");
        assert_eq!(ErrorKind::UnknownRequestType.name(), "UnknownRequestType");
        assert_eq!(ErrorKind::NewInstanceError.name(), "NewInstanceError");
        assert_eq!(ErrorKind::Remote("LoginFailed".into()).name(), "LoginFailed");
    }

    #[test]
    fn error_kind_from_name() {
        assert_eq!(ErrorKind::from_name("NoSuchMethod"), ErrorKind::NoSuchMethod);
        assert_eq!(ErrorKind::from_name("ServiceNotFound"), ErrorKind::ServiceNotFound);
        assert_eq!(ErrorKind::from_name("TypeError"), ErrorKind::Remote("TypeError".into()));
    }

    #[test]
    fn remote_error_blank_name_falls_back() {
        let e = RemotingError::remote("  ", "boom");
        assert_eq!(e.name, GENERIC_ERROR_NAME);
        assert_eq!(e.message.as_deref(), Some("boom"));
    }

    #[test]
    fn error_display() {
        let e = RemotingError::no_such_method("launch");
        assert_eq!(format!("{e}"), "NoSuchMethod: No such method: launch");

        let e = RemotingError::generic("x").without_message();
        assert_eq!(format!("{e}"), "Error");
    }

    #[test]
    fn serde_error_converts() {
        let err = serde_json::from_str::<u32>("\"nope\"").unwrap_err();
        let e: RemotingError = err.into();
        assert_eq!(e.kind(), ErrorKind::SerializationError);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Request types
    // ─────────────────────────────────────────────────────────────────────

    #[test]
    fn known_request_types() {
        for kind in ["services", "exports", "instance", "invoke", "release", "call"] {
            assert!(is_known_request_type(kind), "{kind} should be known");
        }
        assert!(!is_known_request_type("new"));
        assert!(!is_known_request_type(""));
    }
}
