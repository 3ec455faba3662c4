//! Prompt text sent to the completion provider.

/// Persona and ground rules for every completion call.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful customer support assistant. \
Provide accurate, friendly responses based on the context provided. \
Keep responses concise and professional.";

/// Embed the assembled knowledge and the customer's question.
pub fn compose_user_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a customer support assistant. Use the following company information to answer questions accurately:\n\
\n\
COMPANY INFORMATION:\n\
{context}\n\
\n\
CUSTOMER QUESTION: {question}\n\
\n\
Please provide a helpful, accurate response based on the information above. \
If the information isn't in the provided context, say you don't know but can direct them to human support.\n\
Be friendly, professional, and concise in your response."
    )
}
