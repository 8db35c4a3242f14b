use chrono::{Duration, Utc};
use rand::Rng;
use serde_json::json;

const NUM_COMMENTS: usize = 40;
const COMMENT_WORD_COUNT: usize = 25;
const MAX_LIKES: i64 = 50;
const MAX_AGE_DAYS: i64 = 30;

const AUTHORS: &[&str] = &["Admin", "Ana", "Bao", "Chidi", "Dana", "Emeka"];

fn gen_comment(rng: &mut impl Rng, id: usize) -> serde_json::Value {
    let age = Duration::minutes(rng.gen_range(0..MAX_AGE_DAYS * 24 * 60));
    let mut c = json!({
        "id": id.to_string(),
        "text": lipsum::lipsum_words(rng.gen_range(1..=COMMENT_WORD_COUNT)),
        "author": AUTHORS[rng.gen_range(0..AUTHORS.len())],
        "date": (Utc::now() - age).to_rfc3339(),
        "likes": rng.gen_range(0..=MAX_LIKES),
    });
    if rng.gen_bool(0.5) {
        c["image"] = json!(format!("https://i.pravatar.cc/150?u={id}"));
    }
    c
}

/// Prints a comment fixture, as accepted by the mock server's fixture loader
fn main() {
    let mut rng = rand::thread_rng();
    let comments = (1..=NUM_COMMENTS)
        .map(|id| gen_comment(&mut rng, id))
        .collect::<Vec<_>>();
    let fixture = json!({ "comments": comments });
    println!(
        "{}",
        serde_json::to_string_pretty(&fixture).expect("serializing fixture")
    );
}
