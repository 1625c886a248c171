use rtsync::protocol::decode;
use rtsync::protocol::encode::render_form;
use rtsync::protocol::{Decoder, Relation};

#[test]
fn show_example_decodes_id_and_fields() {
    let record = decode::show("id: ticket/42\nSubject: Build fails\nPriority: 10\n--\n", 0);
    assert_eq!(record.get("id"), Some("42"));
    assert_eq!(record.get("Subject"), Some("Build fails"));
    assert_eq!(record.get("Priority"), Some("10"));
    assert_eq!(record.len(), 3);
}

#[test]
fn show_yields_one_field_per_key_line_plus_id_in_order() {
    for count in 0..12 {
        let mut text = String::from("RT/4.4.3 200 Ok\n\nid: ticket/7\n");
        for n in 0..count {
            text.push_str(&format!("Field{n}: value {n}\n"));
        }
        let record = decode::show(&text, 0);
        assert_eq!(record.len(), count + 1);
        let names: Vec<&str> = record.iter().map(|(name, _)| name).collect();
        assert_eq!(names[0], "id");
        for (n, name) in names.iter().skip(1).enumerate() {
            assert_eq!(*name, format!("Field{n}"));
        }
    }
}

#[test]
fn show_keeps_repeated_field_names() {
    let record = decode::show(
        "id: ticket/1\nAttachments: a.txt\nAttachments: b.txt\n",
        0,
    );
    let attachments: Vec<&str> = record.get_all("Attachments").collect();
    assert_eq!(attachments, ["a.txt", "b.txt"]);
}

#[test]
fn continuation_whitespace_survives_rejoin() {
    let original = [
        "Requestors: alice@example.com,",
        "            bob@example.com,",
        "              carol@example.com",
    ];
    let text = format!("id: ticket/3\n{}\nStatus: new\n", original.join("\n"));
    let record = decode::show(&text, 0);

    let folded = record.get("Requestors").unwrap();
    let rejoined = format!("Requestors: {folded}");
    let lines: Vec<&str> = rejoined.split('\n').collect();
    assert_eq!(lines, original);
    assert_eq!(record.get("Status"), Some("new"));
}

#[test]
fn rendered_form_reads_back_verbatim() {
    let body = render_form(&[("Text", "first\nsecond\n  indented")]);
    let record = decode::show(&format!("id: 1\n{body}\n"), 0);
    assert_eq!(record.get("Text"), Some("first\n      second\n        indented"));
}

#[test]
fn short_history_example() {
    let entries = decode::history_short(
        "42: Comments added by alice\n43: Status changed from new to open\n",
        0,
    );
    assert_eq!(
        entries,
        vec![
            ("42".to_string(), "Comments added by alice".to_string()),
            ("43".to_string(), "Status changed from new to open".to_string()),
        ]
    );
}

#[test]
fn long_history_has_one_entry_per_id_line_and_no_bleed() {
    let text = "RT/4.4.3 200 Ok

# 3/3 (id/1/total)

id: 1
Type: Create
Content: created
         with detail
Description: wraps
         but is not folded

--

id: 2
Type: Status
OldValue: new

--

id: 3
Type: Comment
Content: thanks
";
    let entries = decode::history_long(text, 0);
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].id, "1");
    assert_eq!(entries[0].fields.get("Content"), Some("created\n         with detail"));
    assert_eq!(entries[0].fields.get("Description"), Some("wraps"));
    assert_eq!(entries[0].fields.get("OldValue"), None);
    assert_eq!(entries[1].fields.get("OldValue"), Some("new"));
    assert_eq!(entries[1].fields.get("Content"), None);
    assert_eq!(entries[2].fields.get("Content"), Some("thanks"));
}

#[test]
fn links_take_first_token_per_line() {
    let text = "RT/4.4.3 200 Ok

id: ticket/5/links

Members: fsck.com-rt://example.com/ticket/21,
         fsck.com-rt://example.com/ticket/22
DependsOn: fsck.com-rt://example.com/ticket/3
RefersTo: http://wiki.example.com/page
";
    let links = decode::links(text, 0);
    assert_eq!(links.peers(Relation::Members), ["21", "22"]);
    assert_eq!(links.peers(Relation::DependsOn), ["3"]);
    assert!(links.peers(Relation::RefersTo).is_empty());
}

#[test]
fn decoders_return_empty_on_garbage() {
    let garbage = "<html><body>Service unavailable</body></html>\n";
    for decoder in [
        Decoder::Show,
        Decoder::Search,
        Decoder::Queues,
        Decoder::Created,
        Decoder::Links,
        Decoder::HistoryShort,
        Decoder::HistoryLong,
        Decoder::HistoryEntry,
        Decoder::Description,
    ] {
        assert!(decoder.decode(garbage, 0).is_empty(), "{decoder:?}");
    }
}

#[test]
fn start_offset_skips_earlier_records() {
    let text = "id: ticket/1\nSubject: first\n--\nid: ticket/2\nSubject: second\n";
    let offset = text.find("id: ticket/2").unwrap();
    let record = decode::show(text, offset);
    assert_eq!(record.get("id"), Some("2"));
    assert_eq!(record.get("Subject"), Some("second"));
}
