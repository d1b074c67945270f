// src/capabilities/prompts.rs
//! Prompt templates for the text model.

use crate::types::{duration_to_words, MemeContent};

const SCRIPT_PROMPT: &str = r#"You will be given a summary of a news story or research topic.

Write a script for a short video that is as close as possible to {num_words} words long and covers the key points of the source material.

Write it in the voice of a young sarcastic creator: terse, fast-paced, witty, meme-heavy, and happy to roast the people, products and companies involved.

# IMPORTANT
A narrator will read this script aloud. Do not include asterisks, emojis, markdown, ellipses, runs of symbols like "$$$" or any other styling.
Skip filler such as "let's begin" and get straight to the content.
Do not add stage directions or any other non-spoken text.

Respond with a JSON object of the form {"text": "<script>"}.

```
{summary}
```
"#;

const STORYBOARD_PROMPT: &str = r#"You are creating a storyboard for a short-form video. You get the script, the target duration, the reference material used to write the script, and a meme database.

Break the script down into an ordered sequence of scenes.

## Scene types
Use exactly three types: "meme", "twitter" and "generic". Pick the one that fits each chunk best.
Only use "twitter" when the chunk references a tweet.

## Script chunks
Split the script into chunks of 10 to 20 words.
The whole script must appear in the storyboard. Do not change or drop anything.

## Memes
For a "meme" scene, pick an entry from the meme database and copy its name, description and image_url exactly.
Never reuse a meme within one storyboard.

## Tweets
For a "twitter" scene, pick the most relevant tweet URL from the reference material.
Never reuse a tweet within one storyboard.

## Generic
For a "generic" scene, describe a starter image that would work well for the chunk.

Respond with a JSON object of the form:
{"scenes": [{"type": "meme" | "twitter" | "generic", "script_chunk": "...", "meme": {"name": "...", "description": "...", "image_url": "..."} | null, "twitter": {"tweet_url": "..."} | null, "generic": {"image_description": "..."} | null}]}

# Script
```
{script}
```

# Duration
```
{duration}
```

# Reference Material
```
{reference_material}
```

# Meme Database
```
{meme_database}
```
"#;

pub fn script_prompt(source_text: &str, duration_seconds: u32) -> String {
    SCRIPT_PROMPT
        .replace("{num_words}", &duration_to_words(duration_seconds).to_string())
        .replace("{summary}", source_text)
}

pub fn storyboard_prompt(
    script: &str,
    duration_seconds: u32,
    reference_material: &str,
    memes: &[MemeContent],
) -> String {
    let meme_database = serde_json::to_string_pretty(memes).unwrap_or_else(|_| "[]".to_string());
    STORYBOARD_PROMPT
        .replace("{script}", script)
        .replace("{duration}", &duration_seconds.to_string())
        .replace("{reference_material}", reference_material)
        .replace("{meme_database}", &meme_database)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_prompt_asks_for_word_budget() {
        let prompt = script_prompt("big news", 40);
        assert!(prompt.contains("108 words"));
        assert!(prompt.contains("big news"));
        assert!(!prompt.contains("{summary}"));
    }

    #[test]
    fn test_storyboard_prompt_embeds_meme_database() {
        let memes = vec![MemeContent {
            name: "drake".into(),
            image_url: "https://memes/drake.png".into(),
            description: "prefers one thing".into(),
        }];
        let prompt = storyboard_prompt("script body", 30, "refs", &memes);
        assert!(prompt.contains("https://memes/drake.png"));
        assert!(prompt.contains("script body"));
        assert!(!prompt.contains("{meme_database}"));
    }
}
