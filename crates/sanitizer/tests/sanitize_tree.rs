use html::{Node, count_descendants, parse_fragment, to_html, walk_preorder};
use sanitizer::{
    FilterResult, Policy, SanitizeStats, default_policy, sanitize, sanitize_fragment,
    sanitize_html,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;

fn element_names(root: &Node) -> Vec<String> {
    let mut names = Vec::new();
    walk_preorder(root, |node, _| {
        if let Some(name) = node.name() {
            names.push(name.to_string());
        }
    });
    names
}

#[test]
fn default_policy_cleans_mixed_markup() {
    let input = r#"<script>x</script><p>hi<a href="javascript:evil()">x</a><a href="https://ok.example">y</a></p>"#;
    assert_eq!(
        sanitize_html(input, default_policy()).unwrap(),
        concat!(
            r#"<p>hi<a rel="noopener nofollow noreferrer ugc" target="_blank">x</a>"#,
            r#"<a href="https://ok.example" rel="noopener nofollow noreferrer ugc" target="_blank">y</a></p>"#,
        )
    );
}

#[test]
fn custom_elements_are_dropped_with_their_content() {
    let out = sanitize_html("<x-widget><b>k</b></x-widget>t", default_policy()).unwrap();
    assert_eq!(out, "t");
}

#[test]
fn dropped_subtrees_leave_nothing_behind() {
    let policy = Policy::builder().drop_elements(["aside"]).build();
    let fragment = sanitize_fragment(
        "<section><aside><p>note<aside>deep</aside></p></aside><p>body</p></section>",
        &policy,
    )
    .unwrap();
    assert_eq!(element_names(&fragment), vec!["section", "p"]);
    assert_eq!(to_html(&fragment), "<section><p>body</p></section>");
}

#[test]
fn blocked_elements_promote_children_in_order() {
    let policy = Policy::builder().block_elements(["font", "center"]).build();
    let out = sanitize_html(
        "<center>a<font>b<i>c</i></font><font></font>d</center>",
        &policy,
    )
    .unwrap();
    assert_eq!(out, "ab<i>c</i>d");
}

#[test]
fn allow_list_shadows_custom_element_drop() {
    let policy = Policy::builder()
        .allow_elements(["x-safe"])
        .drop_elements(["*-"])
        .build();
    let out = sanitize_html("<x-safe>ok</x-safe><x-bad>no</x-bad>", &policy).unwrap();
    assert_eq!(out, "<x-safe>ok</x-safe>");
}

#[test]
fn surviving_attributes_were_allowed_or_forced() {
    let seen = Arc::new(Mutex::new(HashSet::new()));
    let record = Arc::clone(&seen);
    let policy = Policy::builder()
        .filter_attributes("*", move |name, _| {
            record.lock().unwrap().insert(name.to_string());
            FilterResult::from(name == "title" || name == "lang")
        })
        .set_attribute("p", "data-clean", "1")
        .build();
    let fragment = sanitize_fragment(
        r#"<p title="t" onclick="x()" lang="en"><span style="s" title="u">x</span></p>"#,
        &policy,
    )
    .unwrap();

    let forced: HashSet<&str> = ["data-clean"].into_iter().collect();
    let seen = seen.lock().unwrap();
    walk_preorder(&fragment, |node, _| {
        for (name, _) in node.attributes() {
            assert!(
                forced.contains(name.as_str()) || (seen.contains(name) && name != "onclick"),
                "unexpected attribute {name} on {:?}",
                node.name()
            );
        }
    });
    assert_eq!(
        to_html(&fragment),
        r#"<p title="t" lang="en" data-clean="1"><span title="u">x</span></p>"#
    );
}

#[test]
fn filter_chain_scenario() {
    let policy = Policy::builder()
        .filter_attributes("p", |_, _| FilterResult::Replace("x".to_string()))
        .filter_attributes("*", |_, _| FilterResult::Pass)
        .build();
    let out = sanitize_html(r#"<p title="y">t</p>"#, &policy).unwrap();
    assert_eq!(out, r#"<p title="x">t</p>"#);
}

#[test]
fn comments_follow_the_policy() {
    let keep = Policy::builder().allow_comments(true).build();
    let drop = Policy::builder().allow_comments(false).build();
    let input = "<div><!--a-->x<p><!--b--></p></div>";

    assert_eq!(sanitize_html(input, &keep).unwrap(), input);
    assert_eq!(sanitize_html(input, &drop).unwrap(), "<div>x<p></p></div>");
}

#[test]
fn sanitizing_twice_changes_nothing_more() {
    let inputs = [
        r#"<div class="c"><x-a>1</x-a><span onclick="y">2</span><!--c--></div>"#,
        r#"<a href="https://ok.example" rel="opener">l</a><img src="a.png" onerror="x">"#,
        "<iframe><script>alert(1)</script></iframe>text",
        "<p>unclosed <b>bold",
    ];
    for input in inputs {
        let once = sanitize_html(input, default_policy()).unwrap();
        let twice = sanitize_html(&once, default_policy()).unwrap();
        assert_eq!(once, twice, "input {input:?}");
    }
}

#[test]
fn root_container_is_never_classified() {
    let policy = Policy::builder().drop_elements(["article"]).build();
    let mut root = Node::element(
        "article",
        vec![("onclick".to_string(), Some("x()".to_string()))],
        vec![Node::element("article", vec![], vec![Node::text("inner")])],
    );
    let stats = sanitize(&mut root, &policy).unwrap();
    assert_eq!(to_html(&root), r#"<article onclick="x()"></article>"#);
    assert_eq!(stats.elements_dropped, 1);
}

#[test]
fn text_and_comment_roots_are_left_alone() {
    let policy = Policy::empty();
    let mut text = Node::text("plain");
    let mut comment = Node::comment("c");
    assert_eq!(sanitize(&mut text, &policy).unwrap(), SanitizeStats::default());
    assert_eq!(sanitize(&mut comment, &policy).unwrap(), SanitizeStats::default());
    assert_eq!(comment, Node::comment("c"));
}

#[test]
fn stats_add_up_across_the_tree() {
    let mut fragment = parse_fragment(
        r#"<script>1</script><span>2</span><!--3--><a href="mailto:x" id="i">4</a>"#,
    );
    let policy = default_policy()
        .to_builder()
        .block_elements(["span"])
        .build();
    let stats = sanitize(&mut fragment, &policy).unwrap();
    assert_eq!(stats.elements_dropped, 1);
    assert_eq!(stats.elements_unwrapped, 1);
    assert_eq!(stats.comments_removed, 1);
    assert_eq!(stats.elements_rewritten, 1);
    assert_eq!(stats.attributes.removed, 2);
    assert_eq!(stats.attributes.forced, 2);
    assert_eq!(
        to_html(&fragment),
        r#"2<a rel="noopener nofollow noreferrer ugc" target="_blank">4</a>"#
    );
}

const DEEP: usize = 50_000;

#[test]
fn deeply_nested_blocks_unwrap_completely() {
    let mut fragment = parse_fragment(&("<span>".repeat(DEEP) + "x"));
    let policy = Policy::builder().block_elements(["span"]).build();
    let stats = sanitize(&mut fragment, &policy).unwrap();
    assert_eq!(stats.elements_unwrapped, DEEP);
    assert_eq!(to_html(&fragment), "x");
}

#[test]
fn deeply_nested_drops_leave_nothing() {
    let mut fragment = parse_fragment(&("<div>".repeat(DEEP) + "x"));
    let policy = Policy::builder().drop_elements(["div"]).build();
    let stats = sanitize(&mut fragment, &policy).unwrap();
    assert_eq!(stats.elements_dropped, DEEP);
    assert_eq!(count_descendants(&fragment), 0);
}

#[test]
fn deeply_nested_allowed_elements_are_all_rewritten() {
    let mut fragment = parse_fragment(&("<div title=t>".repeat(DEEP) + "x"));
    let policy = Policy::builder()
        .filter_attributes("*", |_, _| FilterResult::Remove)
        .build();
    let stats = sanitize(&mut fragment, &policy).unwrap();
    assert_eq!(stats.elements_rewritten, DEEP);
    assert_eq!(stats.attributes.removed, DEEP);
    assert_eq!(count_descendants(&fragment), DEEP + 1);
    assert!(!to_html(&fragment).contains("title"));
    // Dropping a chain this deep recurses once per level.
    std::mem::forget(fragment);
}

#[test]
fn markup_inside_foreign_style_is_sanitized() {
    let out = sanitize_html(
        "<svg><style><img src=x onerror=alert(1)></style></svg>",
        default_policy(),
    )
    .unwrap();
    assert_eq!(out, r#"<svg><style><img src="x"></style></svg>"#);
    assert_eq!(sanitize_html(&out, default_policy()).unwrap(), out);
}

#[test]
fn text_that_would_close_a_raw_text_parent_is_escaped() {
    let mut root = Node::fragment(vec![Node::element(
        "style",
        vec![],
        vec![Node::text("</style><img src=x onerror=alert(1)>")],
    )]);
    sanitize(&mut root, default_policy()).unwrap();
    let out = to_html(&root);
    assert_eq!(
        out,
        "<style>&lt;/style&gt;&lt;img src=x onerror=alert(1)&gt;</style>"
    );
    let reparsed = parse_fragment(&out);
    assert_eq!(element_names(&reparsed), vec!["style"]);
}

#[test]
fn one_policy_serves_many_threads() {
    let policy = default_policy()
        .to_builder()
        .set_attribute("p", "data-checked", "yes")
        .build();
    let outputs: Vec<String> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let policy = &policy;
                scope.spawn(move || {
                    sanitize_html(&format!("<p onclick=x>{i}</p><script>{i}</script>"), policy)
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for (i, out) in outputs.iter().enumerate() {
        assert_eq!(out, &format!(r#"<p data-checked="yes">{i}</p>"#));
    }
}
