#![no_main]

use libfuzzer_sys::fuzz_target;
use mailbox_relay::Router;

fuzz_target!(|data: &[u8]| {
    // Any input either fails header decoding or yields a well-formed response
    let router = Router::default();
    if let Ok(reply) = router.handle_bytes(data) {
        assert!(reply.len() >= 7);
    }
});
