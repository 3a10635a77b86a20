//! Prompt construction.
//!
//! Each query mode selects an instruction preamble; the rest of the prompt
//! shape is shared. Prompts instruct the generator to answer strictly from
//! the supplied context and to say so when the context falls short.

use super::types::{IndustryDomain, QueryMode};

fn preamble(mode: QueryMode) -> &'static str {
    match mode {
        QueryMode::Standard | QueryMode::Comparison => {
            "You are an AI assistant that answers questions based on provided document content."
        }
        QueryMode::Industry(IndustryDomain::General) => {
            "You are an AI assistant specializing in industry-specific document analysis."
        }
        QueryMode::Industry(IndustryDomain::Medical) => {
            "You are an AI assistant with expertise in medical document analysis. \
             Provide accurate, evidence-based responses."
        }
        QueryMode::Industry(IndustryDomain::Finance) => {
            "You are an AI assistant with expertise in financial document analysis."
        }
        QueryMode::Industry(IndustryDomain::Retail) => {
            "You are an AI assistant with expertise in retail and product documentation."
        }
        QueryMode::Industry(IndustryDomain::Education) => {
            "You are an AI assistant with expertise in educational content analysis."
        }
    }
}

/// Builds the instruction-and-context prompt for a standard or industry
/// query.
pub fn build_prompt(question: &str, context: &str, mode: QueryMode) -> String {
    format!(
        "{instruction}\n\n\
         Please answer the following question based ONLY on the provided context from the \
         documents. If the context doesn't contain enough information to answer the question \
         completely, say so clearly.\n\n\
         CONTEXT:\n{context}\n\n\
         QUESTION: {question}\n\n\
         INSTRUCTIONS:\n\
         - Base your answer strictly on the provided context\n\
         - If information is not available in the context, state this clearly\n\
         - Provide specific references to source documents and pages when possible\n\
         - Be concise but comprehensive\n\n\
         ANSWER:",
        instruction = preamble(mode),
        context = context,
        question = question,
    )
}

/// Builds the prompt for a multi-document comparison.
pub fn build_comparison_prompt(question: &str, context: &str) -> String {
    format!(
        "You are an AI assistant that specializes in comparing and contrasting information \
         across multiple documents.\n\n\
         Please compare the information from the different documents provided in the context \
         below, focusing on the specific question asked.\n\n\
         CONTEXT FROM MULTIPLE DOCUMENTS:\n{context}\n\n\
         COMPARISON QUESTION: {question}\n\n\
         INSTRUCTIONS:\n\
         - Compare and contrast the information from each document\n\
         - Highlight similarities and differences\n\
         - Point out any contradictions or complementary information\n\
         - Reference specific documents and pages\n\
         - If any document lacks relevant information, mention this\n\n\
         COMPARISON ANALYSIS:",
        context = context,
        question = question,
    )
}
