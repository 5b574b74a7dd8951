//! A8: read the card number off `credit_card.png` through the chat-completions endpoint.

use crate::core::classifier::contains_all;
use crate::core::context::ExecutionContext;
use crate::core::error::TaskError;
use crate::core::params::ResolvedParams;
use crate::core::registry::{Capability, OperationDescriptor, Outcome, no_params};
use crate::core::remote::{ContentPart, ImageUrl};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

const INPUT: &str = "credit_card.png";
const OUTPUT: &str = "credit-card.txt";

const SYSTEM_PROMPT: &str = "You describe images accurately. Focus on the text and numbers \
visible in the image. Be concise.";
const USER_PROMPT: &str = "The image contains a card number. Reply with the card number only, \
digits without spaces.";

pub const DESCRIPTOR: OperationDescriptor = OperationDescriptor {
    id: "A8",
    summary: "Extract the card number from credit_card.png",
    matches,
    extract: no_params,
    handler,
    capabilities: &[Capability::Read, Capability::Write, Capability::Network],
};

fn matches(text: &str) -> bool {
    contains_all(text, &["credit card", "extract"])
}

/// Drop whitespace the model may have kept between digit groups.
pub fn normalize_card_number(reply: &str) -> String {
    reply.chars().filter(|c| !c.is_whitespace()).collect()
}

fn handler(ctx: &ExecutionContext<'_>, _params: &ResolvedParams) -> Result<Outcome, TaskError> {
    let input = ctx.path(INPUT)?;
    let output = ctx.path(OUTPUT)?;
    let image = ctx.read_bytes(&input)?;
    let data_url = format!("data:image/png;base64,{}", STANDARD.encode(&image));

    let reply = ctx.remote()?.chat_completion(
        SYSTEM_PROMPT,
        vec![
            ContentPart::Text {
                text: USER_PROMPT.to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl { url: data_url },
            },
        ],
    )?;
    let number = normalize_card_number(&reply);
    if number.is_empty() {
        return Err(TaskError::RemoteError("model returned an empty reply".to_string()));
    }
    let published = ctx.write_output(&output, number.as_bytes())?;
    Ok(Outcome::new(format!("Wrote card number to {}", OUTPUT)).with_output(published))
}
