use xml_object_stream::{Config, Element, Node, Value, XmlObjectStream};

const LIBRARY: &str = r#"<?xml version="1.0"?>
<library>
  <shelf id="returns"/>
  <section name="fiction">
    <shelf id="1023">
      <book isbn="1"><title>Dune</title><author>Herbert</author></book>
      <book isbn="2"><title>Emma</title><author>Austen</author></book>
    </shelf>
  </section>
  <shelf id="9"><book isbn="3"><title>Ulysses</title></book></shelf>
</library>"#;

fn stream(config: Config) -> XmlObjectStream {
    XmlObjectStream::new(config).unwrap()
}

fn ids(results: &[Node]) -> Vec<&str> {
    results
        .iter()
        .filter_map(Node::as_element)
        .filter_map(|e| e.attribute("id"))
        .collect()
}

#[test]
fn any_depth_pattern_finds_every_shelf() {
    let results = stream(Config::default()).collect_bytes(LIBRARY, "//shelf").unwrap();
    assert_eq!(ids(&results), vec!["returns", "1023", "9"]);
}

#[test]
fn overlapping_patterns_report_each_element_once() {
    let results = stream(Config::default())
        .collect_bytes(LIBRARY, vec!["/library/shelf", "//shelf", "/library/section/shelf"])
        .unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(ids(&results), vec!["returns", "1023", "9"]);
}

#[test]
fn exact_ancestry_only() {
    let results = stream(Config::default()).collect_bytes(LIBRARY, "/library/shelf").unwrap();
    assert_eq!(ids(&results), vec!["returns", "9"]);
}

#[test]
fn gap_in_the_middle_of_a_pattern() {
    let results = stream(Config::default())
        .collect_bytes(LIBRARY, "/library//book/title")
        .unwrap();
    let titles: Vec<_> = results
        .iter()
        .filter_map(Node::as_element)
        .filter_map(Element::text)
        .collect();
    assert_eq!(titles, vec!["Dune", "Emma", "Ulysses"]);
}

#[test]
fn case_folding_follows_strictness() {
    let xml = "<Library><Shelf/></Library>";
    assert!(stream(Config::default()).collect_bytes(xml, "/library/shelf").unwrap().is_empty());
    assert_eq!(
        stream(Config::default().with_strict(false))
            .collect_bytes(xml, "/library/shelf")
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn structural_rendering_keeps_full_shape() {
    let results = stream(Config::default().with_trim(true))
        .collect_bytes(LIBRARY, "/library/section/shelf")
        .unwrap();
    let shelf = results[0].as_element().unwrap();
    assert_eq!(shelf.tag_name(), "shelf");
    assert_eq!(shelf.children().len(), 2);
    assert_eq!(shelf.text(), None);

    let json = serde_json::to_value(shelf).unwrap();
    assert_eq!(json["tagName"], "shelf");
    assert_eq!(json["id"], "1023");
    assert_eq!(json["attributes"]["id"], "1023");
    // the shortcut points at the first book
    assert_eq!(json["book"]["isbn"], "1");
    assert_eq!(json["children"][1]["title"]["text"], "Emma");
}

#[test]
fn collapsed_rendering() {
    let collapsed = stream(Config::default().with_collapsed(true));

    let book = collapsed
        .collect_bytes("<book><title>T</title><author>A</author></book>", "/book")
        .unwrap();
    assert_eq!(
        serde_json::to_value(&book[0]).unwrap(),
        serde_json::json!({"title": "T", "author": "A"})
    );

    let shelf = collapsed.collect_bytes(r#"<shelf id="1023"/>"#, "/shelf").unwrap();
    assert_eq!(serde_json::to_value(&shelf[0]).unwrap(), serde_json::json!({"id": "1023"}));

    let book = collapsed
        .collect_bytes(
            r#"<book><chapter id="1">some text</chapter><chapter id="2">more</chapter></book>"#,
            "/book",
        )
        .unwrap();
    assert_eq!(
        serde_json::to_value(&book[0]).unwrap(),
        serde_json::json!({"chapter": [
            {"id": "1", "text": "some text"},
            {"id": "2", "text": "more"},
        ]})
    );

    let leaf = collapsed.collect_bytes("<a><b>x</b></a>", "/a/b").unwrap();
    assert_eq!(leaf, vec![Node::Value(Value::from("x"))]);
}

#[test]
fn whole_document_and_small_chunks_agree() {
    let patterns = vec!["//shelf", "//title"];
    let whole = stream(Config::default().with_chunk_size(LIBRARY.len()))
        .collect_bytes(LIBRARY, patterns.clone())
        .unwrap();
    let chunked = stream(Config::default().with_chunk_size(32))
        .collect_bytes(LIBRARY, patterns.clone())
        .unwrap();
    let bytewise = stream(Config::default().with_chunk_size(1))
        .collect_bytes(LIBRARY, patterns)
        .unwrap();
    assert_eq!(chunked, whole);
    assert_eq!(bytewise, whole);
}

#[test]
fn entities_and_cdata_are_text() {
    let results = stream(Config::default())
        .collect_bytes("<r><t>Fish &amp; Chips <![CDATA[<fried>]]> &#x263A;</t></r>", "/r/t")
        .unwrap();
    assert_eq!(
        results[0].as_element().and_then(Element::text),
        Some("Fish & Chips <fried> \u{263A}")
    );
}

#[test]
fn normalize_collapses_whitespace_runs() {
    let results = stream(Config::default().with_trim(true).with_normalize(true))
        .collect_bytes("<r><t>  a \n\t b  </t></r>", "/r/t")
        .unwrap();
    assert_eq!(results[0].as_element().and_then(Element::text), Some("a b"));
}

#[test]
fn huge_unmatched_cdata_and_comments_still_yield_results() {
    let payload = "]".repeat(1 << 20);
    let xml = format!("<feed><skip><![CDATA[{payload}x]]><!--{payload}--></skip><item>kept</item></feed>");
    let results = stream(Config::default().with_free_unmatched_nodes(true).with_chunk_size(4096))
        .collect_bytes(&xml, "//item")
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].as_element().and_then(Element::text), Some("kept"));
}

#[test]
fn malformed_markup_is_recovered() {
    let results = stream(Config::default().with_strict(false))
        .collect_bytes("<r><item>1</item><item>2<oops></item><item>3</item></r>", "//item")
        .unwrap();
    assert_eq!(results.len(), 3);
}

#[test]
fn parallel_batch_keeps_input_order() {
    let docs: Vec<String> = (0..16)
        .map(|i| format!("<feed>{}</feed>", "<entry/>".repeat(i)))
        .collect();
    let results = stream(Config::default()).collect_many(&docs, "/feed/entry").unwrap();
    let counts: Vec<_> = results.iter().map(Vec::len).collect();
    assert_eq!(counts, (0..16).collect::<Vec<_>>());
}

#[test]
fn invalid_patterns_fail_up_front() {
    let s = stream(Config::default());
    assert!(matches!(
        s.collect_bytes("<a/>", Vec::<String>::new()),
        Err(xml_object_stream::Error::InvalidPattern(_))
    ));
    assert!(s.collect_bytes("<a/>", "/a//").is_err());
}
