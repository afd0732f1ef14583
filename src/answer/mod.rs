// Answer module
// Retrieves candidate documents and has the language model synthesize a cited answer

pub mod retrieval;


use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::Result;
use crate::llm::{LanguageModel, OutputSchema, generate_structured};
use crate::utilities::truncate_chars;

pub use retrieval::{
    KeywordRetriever, RetrievedDocument, Retriever, SimilarityRetriever,
};

pub const NOT_FOUND_ANSWER: &str = "I couldn't find any relevant documents.";
pub const DEFAULT_CONTEXT_CHARS: usize = 2000;
pub const DEFAULT_MAX_DOCUMENTS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<Source>,
}

impl Answer {
    /// The successful "nothing relevant" result
    #[inline]
    pub fn not_found() -> Self {
        Self {
            answer: NOT_FOUND_ANSWER.to_string(),
            sources: Vec::new(),
        }
    }
}

fn answer_schema() -> OutputSchema {
    OutputSchema {
        name: "answer_with_sources",
        description: "Answer to the question with the documents it cites",
        schema: json!({
            "type": "object",
            "properties": {
                "answer": { "type": "string" },
                "sources": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "url": { "type": "string" }
                        },
                        "required": ["title"]
                    }
                }
            },
            "required": ["answer", "sources"]
        }),
    }
}

/// Number the documents and frame the question for the model
pub(crate) fn build_prompt(
    question: &str,
    documents: &[RetrievedDocument],
    context_chars: usize,
) -> String {
    let context = documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            format!(
                "[{}] {}\n{}",
                i + 1,
                doc.title,
                truncate_chars(&doc.text, context_chars)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    format!(
        "Based on these documents from my Outline, answer the question.\n\n\
         DOCUMENTS:\n{}\n\n\
         QUESTION: {}\n\n\
         Instructions:\n\
         - Answer based ONLY on the documents above\n\
         - Cite which documents you're using (e.g., \"According to document [1]...\")\n\
         - Be specific and factual",
        context, question
    )
}

/// Question answering over one retrieval strategy
pub struct Answerer<'a> {
    retriever: Box<dyn Retriever + 'a>,
    llm: &'a dyn LanguageModel,
    context_chars: usize,
    max_documents: usize,
}

impl<'a> Answerer<'a> {
    #[inline]
    pub fn new(retriever: Box<dyn Retriever + 'a>, llm: &'a dyn LanguageModel) -> Self {
        Self {
            retriever,
            llm,
            context_chars: DEFAULT_CONTEXT_CHARS,
            max_documents: DEFAULT_MAX_DOCUMENTS,
        }
    }

    #[inline]
    pub fn with_context_chars(mut self, context_chars: usize) -> Self {
        self.context_chars = context_chars;
        self
    }

    /// Lower the number of documents put in the prompt; never above
    /// [`DEFAULT_MAX_DOCUMENTS`]
    #[inline]
    pub fn with_max_documents(mut self, max_documents: usize) -> Self {
        self.max_documents = max_documents.clamp(1, DEFAULT_MAX_DOCUMENTS);
        self
    }

    /// Answer `question` from retrieved documents.
    ///
    /// Finding nothing is a successful [`Answer::not_found`], not an error.
    #[inline]
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let mut documents = self.retriever.retrieve(question).await?;
        if documents.is_empty() {
            info!("No relevant documents for question");
            return Ok(Answer::not_found());
        }
        documents.truncate(self.max_documents);

        debug!(
            "Synthesizing answer from {} documents: {:?}",
            documents.len(),
            documents.iter().map(|doc| &doc.title).collect::<Vec<_>>()
        );

        let prompt = build_prompt(question, &documents, self.context_chars);
        let mut answer: Answer = generate_structured(self.llm, &prompt, &answer_schema()).await?;

        for source in &mut answer.sources {
            if source.url.as_deref().is_some_and(|url| url.trim().is_empty()) {
                source.url = None;
            }
        }

        Ok(answer)
    }
}
