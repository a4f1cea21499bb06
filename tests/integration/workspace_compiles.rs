//! Integration test to verify the workspace compiles correctly.

#![allow(clippy::no_effect_underscore_binding)]

#[test]
fn domain_crate_compiles() {
    // Verify domain types are accessible
    let _kind = gatekey_domain::TokenKind::Application;
    let _credentials = gatekey_domain::Credentials::new("cid", "sec");
    let _error = gatekey_domain::AuthError::MissingCode;
}

#[test]
fn application_crate_compiles() {
    // Verify application types are accessible
    fn is_transport<T: gatekey_application::TokenTransport>() {}
    let _check = is_transport::<gatekey_infrastructure::HttpTransport>;
}

#[test]
fn infrastructure_crate_compiles() {
    // Verify infrastructure adapters are accessible
    use gatekey_application::ports::Clock;
    let clock = gatekey_infrastructure::adapters::SystemClock::new();
    let _now = clock.now();
}
