use super::*;
use crate::completion::{MessageContent, Role};
use crate::database::DocumentMetadata;

fn hit(id: u64, description: &str, path: &str, distance: f32) -> SearchHit {
    SearchHit {
        id,
        metadata: DocumentMetadata {
            file_type: "txt".to_string(),
            description: description.to_string(),
            content: format!("content of {}", path),
            path: path.to_string(),
        },
        similarity_score: 1.0 - distance,
        distance,
    }
}

#[test]
fn preserves_rank_order() {
    let hits = vec![
        hit(2, "apple orchard guide", "/b.txt", 0.1),
        hit(0, "apple pie recipe", "/a.txt", 0.2),
        hit(1, "car engine manual", "/c.pdf", 0.9),
    ];

    let context = assemble_context(&hits);

    assert_eq!(context.len(), 3);
    let paths: Vec<&str> = context
        .documents()
        .iter()
        .map(|d| d.path.as_str())
        .collect();
    assert_eq!(paths, vec!["/b.txt", "/a.txt", "/c.pdf"]);
    let ranks: Vec<usize> = context.documents().iter().map(|d| d.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
}

#[test]
fn renders_description_content_and_path() {
    let context = assemble_context(&[hit(0, "apple pie recipe", "/a.txt", 0.2)]);

    assert_eq!(
        context.documents()[0].render(),
        "Description: apple pie recipe\nContent: content of /a.txt\nPath: /a.txt"
    );
    assert_eq!(
        context.to_string(),
        "Document 1: Description: apple pie recipe\nContent: content of /a.txt\nPath: /a.txt"
    );
}

#[test]
fn messages_are_numbered_system_frames() {
    let context = assemble_context(&[
        hit(0, "first", "/1.txt", 0.1),
        hit(1, "second", "/2.txt", 0.2),
    ]);

    let messages = context.to_messages();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.role == Role::System));

    match &messages[1].content {
        MessageContent::Text(text) => {
            assert!(text.starts_with("Document 2: Description: second"));
            assert!(text.ends_with("Path: /2.txt"));
        }
        MessageContent::Parts(_) => panic!("expected a text frame"),
    }
}

#[test]
fn empty_hits_give_empty_list() {
    let context = assemble_context(&[]);

    assert!(context.is_empty());
    assert_eq!(context, DocumentContext::default());
    assert!(context.to_messages().is_empty());
    assert_eq!(context.to_string(), "");
}
