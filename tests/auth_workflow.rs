mod common;

use std::time::Duration;

use nurse_directory::auth::{AuthResult, AuthWorkflow};
use nurse_directory::config::ClientOptions;
use nurse_directory::session::SessionStore;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{api, init_logging, nurse_json, options, wait_for_expiry, UNREACHABLE_URL};

fn workflow(options: &ClientOptions, session: &SessionStore) -> AuthWorkflow {
    AuthWorkflow::new(api(options), session.clone(), options)
}

/// Fails the test on drop if any request reaches the server
async fn forbid_requests(server: &MockServer) {
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_with_blank_credentials_makes_no_request() {
    init_logging();
    let server = MockServer::start().await;
    forbid_requests(&server).await;

    let session = SessionStore::in_memory();
    let auth = workflow(&options(&server), &session);

    for (username, password) in [("", ""), ("nurseA", ""), ("  ", "Passw0rd"), ("nurseA", "   ")] {
        auth.set_username(username);
        auth.set_password(password);
        auth.login().await;
        assert_eq!(
            auth.login_result(),
            AuthResult::Failed("Username and password cannot be empty".to_string())
        );
    }
    assert_eq!(session.logged_nurse_id().unwrap(), None);
}

#[tokio::test]
async fn test_login_success_persists_session() {
    init_logging();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/nurse/authentication"))
        .and(body_json(json!({ "user": "nurseA", "password": "Passw0rd" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(nurse_json(5, "nurseA", "Ana")))
        .expect(1)
        .mount(&server)
        .await;

    let session = SessionStore::in_memory();
    let auth = workflow(&options(&server), &session);
    let mut updates = auth.subscribe_login();

    auth.set_username("nurseA");
    auth.set_password("Passw0rd");
    auth.login().await;

    match auth.login_result() {
        AuthResult::Succeeded(record) => {
            assert_eq!(record.id, Some(5));
            assert_eq!(record.display_name.as_deref(), Some("Ana"));
        }
        other => panic!("unexpected login result: {:?}", other),
    }
    assert_eq!(session.logged_nurse_id().unwrap(), Some(5));

    assert!(updates.has_changed().unwrap());
    assert!(matches!(*updates.borrow_and_update(), AuthResult::Succeeded(_)));
}

#[tokio::test]
async fn test_login_rejected_reports_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/nurse/authentication"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .expect(1)
        .mount(&server)
        .await;

    let session = SessionStore::in_memory();
    let auth = workflow(&options(&server), &session);
    auth.set_username("nurseA");
    auth.set_password("wrong");
    auth.login().await;

    assert_eq!(auth.login_result(), AuthResult::Failed("Login failed: 401".to_string()));
    assert_eq!(session.logged_nurse_id().unwrap(), None);
}

#[tokio::test]
async fn test_login_with_empty_body_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/nurse/authentication"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let session = SessionStore::in_memory();
    let auth = workflow(&options(&server), &session);
    auth.set_username("nurseA");
    auth.set_password("Passw0rd");
    auth.login().await;

    assert_eq!(auth.login_result(), AuthResult::Failed("Login failed: 200".to_string()));
    assert_eq!(session.logged_nurse_id().unwrap(), None);
}

#[tokio::test]
async fn test_login_transport_error() {
    let options = ClientOptions::default().with_base_url(UNREACHABLE_URL);
    let session = SessionStore::in_memory();
    let auth = workflow(&options, &session);
    auth.set_username("nurseA");
    auth.set_password("Passw0rd");
    auth.login().await;

    match auth.login_result() {
        AuthResult::Failed(reason) => assert!(reason.starts_with("Error: "), "{}", reason),
        other => panic!("unexpected login result: {:?}", other),
    }
    assert_eq!(session.logged_nurse_id().unwrap(), None);
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/nurse/authentication"))
        .respond_with(ResponseTemplate::new(200).set_body_json(nurse_json(5, "nurseA", "Ana")))
        .mount(&server)
        .await;

    let session = SessionStore::in_memory();
    let auth = workflow(&options(&server), &session);
    auth.set_username("nurseA");
    auth.set_password("Passw0rd");
    auth.login().await;
    assert_eq!(session.logged_nurse_id().unwrap(), Some(5));

    auth.logout();
    assert_eq!(session.logged_nurse_id().unwrap(), None);
    assert_eq!(auth.login_result(), AuthResult::Idle);
    assert_eq!(auth.username(), "");
    assert_eq!(auth.password(), "");

    auth.logout();
    assert_eq!(session.logged_nurse_id().unwrap(), None);
    assert_eq!(auth.login_result(), AuthResult::Idle);
}

#[tokio::test]
async fn test_reset_login_state_after_failure() {
    let server = MockServer::start().await;
    forbid_requests(&server).await;

    let auth = workflow(&options(&server), &SessionStore::in_memory());
    auth.login().await;
    assert!(auth.login_result().is_terminal());

    auth.reset_login_state();
    assert_eq!(auth.login_result(), AuthResult::Idle);
}

#[tokio::test]
async fn test_register_rejects_taken_username_without_creating() {
    init_logging();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nurse/checkUserAvailability"))
        .and(query_param("user", "nurseA"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(false)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/nurse/registration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(nurse_json(1, "nurseA", "Ana")))
        .expect(0)
        .mount(&server)
        .await;

    let auth = workflow(&options(&server), &SessionStore::in_memory());
    auth.register("nurseA", "Passw0rd", "Ana").await;

    assert_eq!(
        auth.register_result(),
        AuthResult::Failed("Username is already taken".to_string())
    );
}

#[tokio::test]
async fn test_register_validation_happens_before_network() {
    let server = MockServer::start().await;
    forbid_requests(&server).await;

    let auth = workflow(&options(&server), &SessionStore::in_memory());

    auth.register("nurseA", "Password", "Ana").await;
    assert_eq!(
        auth.register_result(),
        AuthResult::Failed("Password must contain at least one digit".to_string())
    );

    auth.register("nurseA", "short", "Ana").await;
    assert_eq!(
        auth.register_result(),
        AuthResult::Failed("Password must be at least 8 characters long".to_string())
    );

    auth.register("nurseA", "Passw0rd", " ").await;
    assert_eq!(
        auth.register_result(),
        AuthResult::Failed("Username, password and name cannot be empty".to_string())
    );

    auth.register_with_confirmation("nurseA", "Passw0rd", "Passw0rD", "Ana")
        .await;
    assert_eq!(
        auth.register_result(),
        AuthResult::Failed("Passwords don't match".to_string())
    );
}

#[tokio::test]
async fn test_register_end_to_end_then_resets_to_idle() {
    init_logging();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nurse/checkUserAvailability"))
        .and(query_param("user", "nurseA"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/nurse/registration"))
        .and(body_json(json!({ "user": "nurseA", "password": "Passw0rd", "name": "Ana" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(nurse_json(1, "nurseA", "Ana")))
        .expect(1)
        .mount(&server)
        .await;

    let auth = workflow(&options(&server), &SessionStore::in_memory());
    auth.set_username("nurseA");
    auth.set_password("Passw0rd");

    auth.register_with_confirmation("nurseA", "Passw0rd", "Passw0rd", "Ana")
        .await;

    match auth.register_result() {
        AuthResult::Succeeded(record) => {
            assert_eq!(record.id, Some(1));
            assert_eq!(record.username, "nurseA");
        }
        other => panic!("unexpected register result: {:?}", other),
    }
    assert_eq!(auth.username(), "");
    assert_eq!(auth.password(), "");

    wait_for_expiry().await;
    assert_eq!(auth.register_result(), AuthResult::Idle);
}

#[tokio::test]
async fn test_register_conflict_on_create_is_a_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nurse/checkUserAvailability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/nurse/registration"))
        .respond_with(ResponseTemplate::new(400).set_body_string("user exists"))
        .expect(1)
        .mount(&server)
        .await;

    let auth = workflow(&options(&server), &SessionStore::in_memory());
    auth.register("nurseA", "Passw0rd", "Ana").await;

    assert_eq!(
        auth.register_result(),
        AuthResult::Failed("Registration failed: 400".to_string())
    );

    wait_for_expiry().await;
    assert_eq!(
        auth.register_result(),
        AuthResult::Failed("Registration failed: 400".to_string())
    );
}

#[tokio::test]
async fn test_register_availability_check_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nurse/checkUserAvailability"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/nurse/registration"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let auth = workflow(&options(&server), &SessionStore::in_memory());
    auth.register("nurseA", "Passw0rd", "Ana").await;

    assert_eq!(
        auth.register_result(),
        AuthResult::Failed("Error checking username availability: 500".to_string())
    );
}

#[tokio::test]
async fn test_login_in_progress_ignores_second_submission() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/nurse/authentication"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(nurse_json(5, "nurseA", "Ana"))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = SessionStore::in_memory();
    let auth = workflow(&options(&server), &session);
    auth.set_username("nurseA");
    auth.set_password("Passw0rd");

    let (_, _, mid_flight) = tokio::join!(
        auth.login(),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            auth.login().await;
        },
        async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            auth.login_result()
        }
    );

    assert_eq!(mid_flight, AuthResult::InProgress);
    assert!(matches!(auth.login_result(), AuthResult::Succeeded(_)));
    assert_eq!(session.logged_nurse_id().unwrap(), Some(5));
}

#[tokio::test]
async fn test_register_in_progress_ignores_second_submission() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/nurse/checkUserAvailability"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!(true))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/nurse/registration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(nurse_json(1, "nurseA", "Ana")))
        .expect(1)
        .mount(&server)
        .await;

    let auth = workflow(&options(&server), &SessionStore::in_memory());

    let (_, _, mid_flight) = tokio::join!(
        auth.register("nurseA", "Passw0rd", "Ana"),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            auth.register("nurseA", "Passw0rd", "Ana").await;
        },
        async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            auth.register_result()
        }
    );

    assert_eq!(mid_flight, AuthResult::InProgress);
    match auth.register_result() {
        AuthResult::Succeeded(record) => assert_eq!(record.id, Some(1)),
        other => panic!("unexpected register result: {:?}", other),
    }
}
