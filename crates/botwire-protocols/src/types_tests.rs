use super::*;
use serde_json::json;

#[test]
fn test_request_serialize_envelope() {
    let mut req = ApiRequest::new("send_msg", json!({"message": "hi"}));
    req.echo = 7;
    let value = serde_json::to_value(&req).unwrap();
    assert_eq!(value["action"], "send_msg");
    assert_eq!(value["params"]["message"], "hi");
    assert_eq!(value["echo"], 7);
}

#[test]
fn test_request_new_has_no_echo() {
    let req = ApiRequest::new("get_status", Value::Null);
    assert_eq!(req.echo, 0);
}

#[test]
fn test_response_from_full_frame() {
    let frame = json!({
        "status": "ok",
        "data": {"user_id": 10},
        "msg": "",
        "wording": "",
        "retcode": 0,
        "echo": 42
    });
    let rsp = ApiResponse::from_frame(&frame);
    assert_eq!(rsp.status(), "ok");
    assert_eq!(rsp.data()["user_id"], 10);
    assert_eq!(rsp.echo(), 42);
    assert!(rsp.is_ok());
}

#[test]
fn test_response_from_sparse_frame() {
    let rsp = ApiResponse::from_frame(&json!({"echo": 3}));
    assert_eq!(rsp.status(), "");
    assert_eq!(rsp.data(), &Value::Null);
    assert_eq!(rsp.retcode(), 0);
    assert_eq!(rsp.echo(), 3);
    assert!(!rsp.is_ok());
}

#[test]
fn test_response_failed_status() {
    let frame = json!({
        "status": "failed",
        "retcode": 100,
        "msg": "INVALID_PARAM",
        "wording": "bad group id",
        "echo": "9"
    });
    let rsp = ApiResponse::from_frame(&frame);
    assert_eq!(rsp.retcode(), 100);
    assert_eq!(rsp.msg(), "INVALID_PARAM");
    assert_eq!(rsp.wording(), "bad group id");
    assert_eq!(rsp.echo(), 9);
    assert!(!rsp.is_ok());
}

#[test]
fn test_parse_echo_variants() {
    assert_eq!(parse_echo(&json!(5)), Some(5));
    assert_eq!(parse_echo(&json!("12")), Some(12));
    assert_eq!(parse_echo(&json!(" 8 ")), Some(8));
    assert_eq!(parse_echo(&json!(-1)), None);
    assert_eq!(parse_echo(&json!("abc")), None);
    assert_eq!(parse_echo(&Value::Null), None);
}

#[test]
fn test_response_builder() {
    let rsp = ApiResponse::new("ok", json!([1, 2]), 0, 11).with_message("done", "all good");
    assert_eq!(rsp.msg(), "done");
    assert_eq!(rsp.wording(), "all good");
    assert_eq!(rsp.into_data(), json!([1, 2]));
}
