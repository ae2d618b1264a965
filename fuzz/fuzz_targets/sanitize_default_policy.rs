#![no_main]

use libfuzzer_sys::fuzz_target;
use sanitizer::{default_policy, sanitize_html};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let once = sanitize_html(input, default_policy()).expect("sanitize");
    let twice = sanitize_html(&once, default_policy()).expect("re-sanitize");
    assert_eq!(once, twice, "sanitized output is not a fixed point");

    let dom = html::parse_fragment(&once);
    html::walk_preorder(&dom, |node, _| {
        if let Some(name) = node.name() {
            assert!(
                !matches!(name, "script" | "iframe") && !name.contains('-'),
                "forbidden element <{name}> survived"
            );
        }
    });
});
