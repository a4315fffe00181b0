//! Fuzz target for inbound frame decoding
//!
//! # Strategy
//!
//! - Raw text: arbitrary strings fed straight to the decoder
//! - Shaped frames: valid JSON objects with arbitrary `type` tags and fields
//!
//! # Invariants
//!
//! - NEVER panic on malformed JSON
//! - Anything that decodes re-encodes and decodes to the same value
//! - Unrecognised tags decode to `Unknown`, never an error

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use xbzchat_proto::Inbound;

const KNOWN: &[&str] = &["message", "system", "history", "online_users", "pong"];

#[derive(Debug, Arbitrary)]
enum Input {
    Raw(String),
    Shaped { tag: String, nickname: Option<String>, content: String, timestamp: String },
}

fuzz_target!(|input: Input| {
    let text = match input {
        Input::Raw(text) => text,
        Input::Shaped { tag, nickname, content, timestamp } => {
            let mut object = vec![
                ("type".to_string(), quote(&tag)),
                ("content".to_string(), quote(&content)),
                ("timestamp".to_string(), quote(&timestamp)),
            ];
            if let Some(nickname) = nickname {
                object.push(("nickname".to_string(), quote(&nickname)));
            }
            let body: Vec<String> =
                object.into_iter().map(|(k, v)| format!("\"{k}\":{v}")).collect();
            let text = format!("{{{}}}", body.join(","));

            if !KNOWN.contains(&tag.as_str()) {
                assert_eq!(Inbound::decode(&text).ok(), Some(Inbound::Unknown));
            }
            text
        },
    };

    if let Ok(inbound) = Inbound::decode(&text) {
        if inbound != Inbound::Unknown {
            let encoded = inbound.encode().unwrap();
            assert_eq!(Inbound::decode(&encoded).unwrap(), inbound);
        }
    }
});

fn quote(s: &str) -> String {
    let mut out = String::from("\"");
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
