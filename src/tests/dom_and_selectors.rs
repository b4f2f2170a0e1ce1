use super::*;

const PLAYER_HTML: &str = "<div id='player' class='player paused'>\
<button id='play' class='control' aria-label='Play'>Play</button>\
<button id='shuffle' class='control toggle' data-state='off'>Shuffle</button>\
<span class='title'>Song &amp; Dance</span>\
</div><footer><a href='/help'>Help</a></footer>";

#[test]
fn query_selector_supports_combinators_and_attribute_conditions() -> Result<()> {
    let doc = Document::from_html(PLAYER_HTML)?;
    let play = element(&doc, "play");
    let shuffle = element(&doc, "shuffle");

    assert_eq!(doc.query_selector("#player > .control")?, Some(play));
    assert_eq!(doc.query_selector("button.toggle")?, Some(shuffle));
    assert_eq!(doc.query_selector("[aria-label='Play']")?, Some(play));
    assert_eq!(doc.query_selector("button[data-state^=of]")?, Some(shuffle));
    assert_eq!(doc.query_selector("#play + button")?, Some(shuffle));
    assert_eq!(doc.query_selector_all("#play ~ *")?.len(), 2);
    assert_eq!(doc.query_selector_all("div .control, footer a")?.len(), 3);
    assert_eq!(doc.query_selector("footer .control")?, None);
    Ok(())
}

#[test]
fn query_selector_from_is_scoped_to_the_subtree() -> Result<()> {
    let doc = Document::from_html(PLAYER_HTML)?;
    let player = element(&doc, "player");
    assert!(doc.query_selector_from(player, "a")?.is_none());
    assert_eq!(
        doc.query_selector_from(player, ".control")?,
        Some(element(&doc, "play"))
    );
    Ok(())
}

#[test]
fn unsupported_selectors_are_reported() -> Result<()> {
    let doc = Document::from_html(PLAYER_HTML)?;
    assert!(matches!(
        doc.query_selector("button:hover"),
        Err(Error::UnsupportedSelector(_))
    ));
    assert!(matches!(
        doc.query_selector("#player >"),
        Err(Error::UnsupportedSelector(_))
    ));
    Ok(())
}

#[test]
fn text_content_concatenates_decoded_descendant_text() -> Result<()> {
    let doc = Document::from_html(PLAYER_HTML)?;
    let player = element(&doc, "player");
    assert_eq!(doc.text_content(player)?, "PlayShuffleSong & Dance");
    Ok(())
}

#[test]
fn outer_html_serializes_sorted_escaped_attributes() -> Result<()> {
    let mut doc = Document::from_html("<p id='x' class='a'>1 &lt; 2</p><br>")?;
    let p = element(&doc, "x");
    doc.set_attr(p, "title", "say \"hi\"")?;
    assert_eq!(
        doc.outer_html(p)?,
        "<p class=\"a\" id=\"x\" title=\"say &quot;hi&quot;\">1 &lt; 2</p>"
    );
    assert_eq!(
        doc.dump(),
        "<p class=\"a\" id=\"x\" title=\"say &quot;hi&quot;\">1 &lt; 2</p><br>"
    );
    let text = doc.children(p)[0];
    assert!(matches!(doc.outer_html(text), Err(Error::DomOperation(_))));
    Ok(())
}

#[test]
fn id_index_follows_attribute_and_tree_changes() -> Result<()> {
    let mut doc = Document::from_html("<div id='old'>x</div>")?;
    let div = element(&doc, "old");

    doc.set_attr(div, "id", "new")?;
    assert_eq!(doc.get_element_by_id("old"), None);
    assert_eq!(doc.get_element_by_id("new"), Some(div));

    doc.remove_node(div)?;
    assert_eq!(doc.get_element_by_id("new"), None);
    assert!(doc.contains_node(div));
    assert!(!doc.is_connected(div));
    Ok(())
}

#[test]
fn created_nodes_attach_in_order() -> Result<()> {
    let mut doc = Document::from_html("<ul id='list'><li id='last'>c</li></ul>")?;
    let list = element(&doc, "list");
    let last = element(&doc, "last");

    let first = doc.create_element("LI")?;
    let first_text = doc.create_text("a");
    doc.append_child(first, first_text)?;
    doc.insert_before(list, first, last)?;
    let middle = doc.create_element("li")?;
    doc.set_text_content(middle, "b")?;
    doc.insert_before(list, middle, last)?;

    assert_eq!(doc.tag_name(first), Some("li"));
    assert_eq!(doc.children(list), vec![first, middle, last]);
    doc.assert_text("#list", "abc")?;
    Ok(())
}

#[test]
fn invalid_tree_operations_are_rejected() -> Result<()> {
    let mut doc = Document::from_html("<div id='outer'><p id='inner'>x</p></div>")?;
    let outer = element(&doc, "outer");
    let inner = element(&doc, "inner");
    let text = doc.children(inner)[0];

    assert!(matches!(
        doc.append_child(inner, outer),
        Err(Error::DomOperation(_))
    ));
    assert!(matches!(
        doc.append_child(text, outer),
        Err(Error::DomOperation(_))
    ));
    assert!(matches!(
        doc.remove_node(doc.root()),
        Err(Error::DomOperation(_))
    ));
    assert!(matches!(
        doc.create_element("no spaces"),
        Err(Error::DomOperation(_))
    ));
    assert!(matches!(
        doc.class_add(inner, "two words"),
        Err(Error::DomOperation(_))
    ));
    Ok(())
}

#[test]
fn class_helpers_edit_the_token_list() -> Result<()> {
    let mut doc = Document::from_html("<div id='job' class='a  b'>x</div>")?;
    let job = element(&doc, "job");

    assert!(doc.class_contains(job, "b")?);
    assert!(!doc.class_toggle(job, "a")?);
    assert!(doc.class_toggle(job, "c")?);
    doc.class_add(job, "b")?;
    assert_eq!(doc.class_list(job)?, vec!["b".to_string(), "c".to_string()]);
    doc.assert_class("#job", "a", false)?;
    doc.assert_class("#job", "c", true)?;
    Ok(())
}

#[test]
fn assertion_failures_carry_a_snippet() -> Result<()> {
    let doc = Document::from_html("<p id='status'>Waiting</p>")?;
    match doc.assert_text("#status", "Done") {
        Err(Error::AssertionFailed {
            selector,
            expected,
            actual,
            dom_snippet,
        }) => {
            assert_eq!(selector, "#status");
            assert_eq!(expected, "Done");
            assert_eq!(actual, "Waiting");
            assert_eq!(dom_snippet, "<p id=\"status\">Waiting</p>");
        }
        other => panic!("expected assertion failure, got: {other:?}"),
    }
    assert!(matches!(
        doc.assert_exists("#missing"),
        Err(Error::SelectorNotFound(_))
    ));
    let rendered = doc
        .assert_class("#status", "done", true)
        .expect_err("class is absent")
        .to_string();
    assert!(rendered.starts_with("assertion failed for #status"), "{rendered}");
    Ok(())
}

#[test]
fn deeply_nested_fixture_does_not_overflow() -> Result<()> {
    let depth = 20_000;
    let mut html = String::new();
    for _ in 0..depth {
        html.push_str("<div>");
    }
    html.push_str("<span id='leaf'>deep</span>");
    for _ in 0..depth {
        html.push_str("</div>");
    }

    let doc = Document::from_html(&html)?;
    let leaf = element(&doc, "leaf");
    assert_eq!(doc.text_content(doc.root())?, "deep");
    assert!(doc.is_connected(leaf));
    assert!(doc.dump().ends_with("</div>"));
    Ok(())
}
