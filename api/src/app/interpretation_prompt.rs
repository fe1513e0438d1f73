//! Prompt text for reply interpretation

use crate::app::template_renderer::{render_template, TemplateVars};

pub const SYSTEM_PROMPT: &str = "You classify replies to event invitations. \
Answer with a single JSON object and nothing else.";

/// `{messages}` is replaced with the talent's reply thread, oldest first
pub const INTERPRETATION_PROMPT: &str = r#"A talent was invited to an event by a promoter and replied with the messages below, oldest first. Read the whole thread as one conversation; later messages may change earlier answers.

Return exactly one JSON object with these four fields and no other text:
{
  "status": one of "confirmed", "declined", "maybe", "ignored", "pending",
  "score": integer trust change, usually between -10 and 15,
  "score_reason": short snake_case label for the score,
  "current_location": city the talent says they are in, or "default" if none is mentioned
}

Status is about THIS event only:
- "confirmed": the talent will come.
- "declined": the talent will not come to this event.
- "maybe": undecided, or asks for more details before deciding.
- "ignored": the reply does not address the invitation at all.
- "pending": nothing in the thread can be classified yet.

Score is about the relationship with the promoter going forward:
- Positive when the talent engages, thanks the promoter or shows interest, including interest in future events while declining this one.
- Around zero for neutral replies.
- Between -5 and -10 when the talent asks to stop receiving messages, reports spam, or rejects all future contact. Use the score_reason "explicit_permanent_rejection" in that case.

Judge meaning, not wording: replies may be in any language.

Thread:
{messages}"#;

/// Join a thread into the prompt
pub fn build_prompt(messages: &[String]) -> String {
    let vars = TemplateVars::new().set("messages", messages.join("\n\n"));
    render_template(INTERPRETATION_PROMPT, &vars)
}
