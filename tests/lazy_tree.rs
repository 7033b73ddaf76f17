//! Public-API walkthroughs of the lazy tree: navigation, pairing,
//! attribute mutation, and cache behavior as a consumer sees them.

use pretty_assertions::assert_eq;
use textdom::{DomError, ElementKind, TokenKind, XmlSource};

#[test]
fn test_offset_identity_across_rederivation() {
    let src = XmlSource::new("<root><item>x</item></root>");
    let item = src.first_element().unwrap().next().unwrap();
    src.clear_cache();
    let again = src.element_at(item.offset()).unwrap();
    assert_eq!(item, again);
    assert_eq!(again.name(), Some("item"));
}

#[test]
fn test_neighbor_symmetry_over_mixed_document() {
    let src = XmlSource::new(
        "<?xml version=\"1.0\"?><!DOCTYPE r><r><!--c-->text&amp;<![CDATA[d]]><e/></r>",
    );
    let mut forward = Vec::new();
    let mut cur = src.first_element();
    while let Some(el) = cur {
        forward.push(el.clone());
        cur = el.next();
    }
    let kinds: Vec<_> = forward.iter().map(|e| e.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            ElementKind::Pi,
            ElementKind::Declaration,
            ElementKind::StartTag,
            ElementKind::Comment,
            ElementKind::Text,
            ElementKind::EntityRef,
            ElementKind::Cdata,
            ElementKind::EmptyTag,
            ElementKind::EndTag,
        ]
    );
    // Walking back reproduces the forward chain exactly
    let mut backward = Vec::new();
    let mut cur = forward.last().cloned();
    while let Some(el) = cur {
        backward.push(el.clone());
        cur = el.previous();
    }
    backward.reverse();
    assert_eq!(forward, backward);
}

#[test]
fn test_pairing_soundness() {
    let src = XmlSource::new("<a><b>t</b></a>");
    let a = src.first_element().unwrap();
    let end = a.matching_end_tag().unwrap();
    assert_eq!(end.kind(), ElementKind::EndTag);
    assert!(a.same_tag(&end));
    assert_eq!(end.matching_start_tag().unwrap(), a);
}

#[test]
fn test_interleaved_tags_never_pair() {
    let src = XmlSource::new("<a><b></a>");
    let a = src.first_element().unwrap();
    let b = a.next().unwrap();
    assert_eq!(a.matching_end_tag(), None);
    assert_eq!(b.matching_end_tag(), None);
    assert_eq!(a.children(), vec![]);
}

#[test]
fn test_attribute_round_trip_and_replacement() {
    let src = XmlSource::new("<item class=\"old\" id='7'>v</item>");
    let item = src.first_element().unwrap();
    let attrs = item.attributes();
    let names: Vec<_> = attrs.names().collect();
    assert_eq!(names, vec!["class", "id"]);

    let mut class = item.attribute("class").unwrap();
    class.set_value("new").unwrap();
    assert_eq!(src.text(), "<item class=\"new\" id='7'>v</item>");
    assert_eq!(src.version(), 1);

    // The rest of the tag is untouched
    let item = src.first_element().unwrap();
    assert_eq!(item.attribute("id").unwrap().value().as_deref(), Some("7"));
}

#[test]
fn test_unterminated_value_closed_on_write() {
    let src = XmlSource::new("<div class=\"x");
    let div = src.first_element().unwrap();
    let mut class = div.attribute("class").unwrap();
    assert_eq!(class.value().as_deref(), Some("x"));
    class.set_value("w").unwrap();
    assert_eq!(src.text(), "<div class=\"w\"");
}

#[test]
fn test_terminated_value_keeps_shape_on_write() {
    let src = XmlSource::new("<div class='x'>");
    let mut class = src
        .first_element()
        .unwrap()
        .attribute("class")
        .unwrap();
    class.set_value("w").unwrap();
    assert_eq!(src.text(), "<div class='w'>");
}

#[test]
fn test_reads_idempotent_across_cache_clear() {
    let src = XmlSource::new("<a href=\"u\">link&lt;</a>");
    let collect = |src: &XmlSource| {
        let mut out = Vec::new();
        let mut cur = src.first_element();
        while let Some(el) = cur {
            out.push((el.kind(), el.offset(), el.value()));
            cur = el.next();
        }
        out
    };
    let before = collect(&src);
    src.clear_cache();
    assert_eq!(before, collect(&src));
}

#[test]
fn test_self_closing_is_own_pair_with_no_children() {
    let src = XmlSource::new("<hr/>");
    let hr = src.first_element().unwrap();
    assert!(hr.is_start());
    assert!(hr.is_end());
    assert!(hr.is_self_closing());
    assert_eq!(hr.matching_end_tag().unwrap(), hr);
    assert_eq!(hr.children(), vec![]);
    assert_eq!(hr.first_child(), None);
}

#[test]
fn test_version_bumps_and_stale_handles_rederive() {
    let src = XmlSource::new("<a>one</a>");
    assert_eq!(src.version(), 0);
    let text = src.first_element().unwrap().next().unwrap();
    assert_eq!(text.value().as_deref(), Some("one"));

    src.buffer()
        .run_atomic_edit(|edit| {
            edit.remove(3, 3)?;
            edit.insert(3, "two")
        })
        .unwrap();
    assert_eq!(src.version(), 1);
    // The old handle re-derives against the current buffer
    assert_eq!(text.value().as_deref(), Some("two"));
}

#[test]
fn test_error_sentinel_reports_enclosing_element() {
    let src = XmlSource::new("<p>ok < bad</p>");
    let text = src.first_element().unwrap().next().unwrap();
    let stray = text.next().unwrap();
    assert_eq!(stray.kind(), ElementKind::Error);
    assert_eq!(stray.enclosing_element().unwrap(), text);
}

#[test]
fn test_adversarial_nesting_reports_unmatched() {
    let depth = 600;
    let mut doc = String::new();
    for _ in 0..depth {
        doc.push_str("<d>");
    }
    for _ in 0..depth {
        doc.push_str("</d>");
    }
    let src = XmlSource::new(doc);
    let outer = src.first_element().unwrap();
    assert_eq!(outer.matching_end_tag(), None);
    assert_eq!(outer.children(), vec![]);
}

#[test]
fn test_scoped_token_sequence() {
    let src = XmlSource::new("<a b=\"c\">t</a>");
    let kinds = src
        .buffer()
        .with_token_sequence(0, |cursor| {
            let mut out = Vec::new();
            while let Some(tok) = cursor.next_token() {
                out.push(tok.kind);
            }
            out
        })
        .unwrap();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Tag,
            TokenKind::Ws,
            TokenKind::Argument,
            TokenKind::Operator,
            TokenKind::Value,
            TokenKind::Tag,
            TokenKind::Text,
            TokenKind::Tag,
            TokenKind::Tag,
        ]
    );
    let err = src.buffer().with_token_sequence(999, |_| ()).unwrap_err();
    assert_eq!(err, DomError::PositionUnavailable { offset: 999 });
}

#[test]
fn test_unsupported_writes_fail_fast() {
    let src = XmlSource::new("<a b=\"c\"/>");
    let tag = src.first_element().unwrap();
    assert!(matches!(
        tag.add_attribute("x", "1"),
        Err(DomError::ReadOnly { .. })
    ));
    assert!(matches!(
        tag.append_child("<c/>"),
        Err(DomError::ReadOnly { .. })
    ));
    let b = tag.attribute("b").unwrap();
    assert!(matches!(b.remove(), Err(DomError::ReadOnly { .. })));
}
