#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // A config that parses must build a server that can issue a token.
        if let Ok(config) = authcore::AuthConfig::from_toml_str(s) {
            let server = authcore::AuthServer::new(config).expect("validated config");
            server.create_user("fuzz", "fuzz-password").expect("fresh user");
            assert!(server.authenticate("fuzz", "fuzz-password").is_ok());
        }
    }
});
