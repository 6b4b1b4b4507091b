use std::time::Duration;

use finesse_notifier::finesse::{AgentState, ApiError, Credentials, Endpoints, FinesseClient};
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_PATH: &str = "/finesse/api/User/1001/";
const READY: &str = "<User><firstName>Ana</firstName><lastName>Lima</lastName><state>READY</state></User>";
const NOT_READY: &str = "<User><firstName>Ana</firstName><lastName>Lima</lastName><state>NOT_READY</state><reasonCodeId>7</reasonCodeId></User>";

fn credentials() -> Credentials {
    Credentials::new("agent", "s3cret", "1001")
}

fn client(primary: &MockServer, secondary: &MockServer) -> FinesseClient {
    let mut endpoints = Endpoints::new(
        format!("{}/finesse/api", primary.uri()),
        format!("{}/finesse/api/", secondary.uri()),
    );
    endpoints.timeout_ms = 300;
    FinesseClient::new(endpoints).unwrap()
}

#[tokio::test]
async fn test_fetch_status_from_primary() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(USER_PATH))
        .and(header("Authorization", "Basic YWdlbnQ6czNjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(READY))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(READY))
        .expect(0)
        .mount(&secondary)
        .await;

    let status = client(&primary, &secondary)
        .fetch_status(&credentials())
        .await
        .unwrap();
    assert_eq!(status.display_name(), "Ana Lima");
    assert_eq!(status.state(), Some(AgentState::Ready));
}

#[tokio::test]
async fn test_primary_error_fails_over_once() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(USER_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .and(path(USER_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(NOT_READY))
        .expect(1)
        .mount(&secondary)
        .await;

    let status = client(&primary, &secondary)
        .fetch_status(&credentials())
        .await
        .unwrap();
    assert_eq!(status.reason_code_id(), Some(7));
}

#[tokio::test]
async fn test_both_endpoints_failing_is_unreachable() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&secondary)
        .await;

    let err = client(&primary, &secondary)
        .fetch_status(&credentials())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ApiError::Unreachable {
            primary: Box::new(ApiError::Status(500)),
            secondary: Box::new(ApiError::Status(503)),
        }
    );
}

#[tokio::test]
async fn test_slow_primary_times_out_and_fails_over() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(READY)
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(READY))
        .expect(1)
        .mount(&secondary)
        .await;

    let status = client(&primary, &secondary)
        .fetch_status(&credentials())
        .await
        .unwrap();
    assert_eq!(status.first_name(), Some("Ana"));
}

#[tokio::test]
async fn test_error_document_is_unauthorized() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<ApiErrors><ApiError><ErrorType>Authorization Failure</ErrorType>\
             <ErrorMessage>Invalid credentials</ErrorMessage></ApiError></ApiErrors>",
        ))
        .mount(&primary)
        .await;

    let err = client(&primary, &secondary)
        .fetch_status(&credentials())
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::Unauthorized("Invalid credentials".to_string()));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<User><firstName>Ana</User>"))
        .mount(&primary)
        .await;

    let err = client(&primary, &secondary)
        .fetch_status(&credentials())
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::MalformedResponse(_)));
}

#[tokio::test]
async fn test_submit_state_never_contacts_secondary() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(USER_PATH))
        .and(header("Content-Type", "application/xml"))
        .and(body_string(
            "<User><state>NOT_READY</state><reasonCodeId>7</reasonCodeId></User>",
        ))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&secondary)
        .await;

    let err = client(&primary, &secondary)
        .submit_state(&credentials(), &AgentState::NotReady, Some(7))
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::Status(500));
}

#[tokio::test]
async fn test_submit_state_without_echo_reads_back() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(USER_PATH))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .and(path(USER_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(READY))
        .expect(1)
        .mount(&primary)
        .await;

    let status = client(&primary, &secondary)
        .submit_state(&credentials(), &AgentState::Ready, None)
        .await
        .unwrap();
    assert_eq!(status.state(), Some(AgentState::Ready));
}

#[tokio::test]
async fn test_list_reason_codes() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/finesse/api/ReasonCodes"))
        .and(query_param("category", "NOT_READY"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<ReasonCodes>\
               <ReasonCode><category>NOT_READY</category><uri>/finesse/api/ReasonCode/5</uri>\
                 <code>10</code><label>Lunch</label><forAll>true</forAll></ReasonCode>\
               <ReasonCode><category>NOT_READY</category><uri>/finesse/api/ReasonCode/28</uri>\
                 <code>28</code><label>Device</label><forAll>false</forAll></ReasonCode>\
             </ReasonCodes>",
        ))
        .expect(1)
        .mount(&primary)
        .await;

    let list = client(&primary, &secondary)
        .list_reason_codes(&credentials())
        .await
        .unwrap();
    assert_eq!(list.codes.len(), 2);
    let lunch = list.find(5).unwrap();
    assert_eq!(lunch.label, "Lunch");
    assert_eq!(lunch.code.as_deref(), Some("10"));
    assert!(lunch.for_all);
    assert!(!list.find(28).unwrap().for_all);
}
