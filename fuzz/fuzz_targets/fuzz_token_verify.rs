#![no_main]
use authcore::{AuthConfig, AuthError, AuthServer, RoleId};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(server) = AuthServer::new(AuthConfig::default()) else {
        return;
    };
    let Ok(_) = server.create_user("fuzz", "fuzz-password") else {
        return;
    };
    let Ok(role) = server.create_role("fuzz") else {
        return;
    };

    // Arbitrary presented tokens must only ever be rejected, never panic.
    let presented = String::from_utf8_lossy(data);
    assert_eq!(
        server.check_role(&presented, role),
        Err(AuthError::InvalidToken)
    );
    assert_eq!(
        server.all_roles(&presented),
        Err(AuthError::InvalidToken)
    );
    server.invalidate(&presented);
    let _ = server.check_role(&presented, RoleId(0));
});
