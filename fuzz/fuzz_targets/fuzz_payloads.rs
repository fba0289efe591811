#![no_main]

use libfuzzer_sys::fuzz_target;
use mailbox_relay::core::payload::{
    decode_message_payload, decode_registration_payload, parse_message_batch, parse_user_list,
};

fuzz_target!(|data: &[u8]| {
    let _ = decode_registration_payload(data);
    let _ = decode_message_payload(data);
    let _ = parse_user_list(data);
    let _ = parse_message_batch(data);
});
