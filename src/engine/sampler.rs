// src/engine/sampler.rs

use rand::seq::SliceRandom;

use crate::{
    error::AppError,
    models::{question::Question, quiz::QuizRules},
    store::QuizStore,
};

/// Draws `count` items uniformly at random without replacement.
/// Returns everything, shuffled, when fewer than `count` are available.
pub fn sample<T: Clone>(items: &[T], count: usize) -> Vec<T> {
    let mut rng = rand::thread_rng();
    items.choose_multiple(&mut rng, count).cloned().collect()
}

/// Picks the questions for a new attempt from the whole course. The returned
/// order is the presentation order. `by_topics` is kept on the rules but does
/// not narrow the draw.
pub async fn sample_questions(
    store: &dyn QuizStore,
    course_id: i64,
    rules: &QuizRules,
) -> Result<Vec<Question>, AppError> {
    store
        .sample_questions(course_id, rules.count)
        .await
}
