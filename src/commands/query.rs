use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use super::ingest::load_documents;
use crate::answer::AnswerGenerator;
use crate::config::Config;
use crate::retriever::{FragmentOrigin, HybridRetriever, RetrievalContext};
use crate::router::RouteDecision;

#[derive(Debug, Clone, Default)]
pub struct QueryArgs {
    pub query: String,
    /// Files ingested before querying (useful with the ephemeral local index)
    pub docs: Vec<PathBuf>,
    /// Route override: vector | graph | hybrid (and their aliases)
    pub mode: Option<String>,
    pub answer: bool,
    pub top_k: Option<usize>,
    pub json: bool,
}

pub async fn run(config: &Config, args: QueryArgs) -> Result<()> {
    let mut config = config.clone();
    if let Some(top_k) = args.top_k {
        config.vector_store.top_k = top_k;
    }

    let forced_route = args
        .mode
        .as_deref()
        .map(str::parse::<RouteDecision>)
        .transpose()?;

    let retriever = HybridRetriever::connect(&config)
        .await
        .context("failed to initialise retriever")?;

    if !args.docs.is_empty() {
        let documents = load_documents(&args.docs)?;
        let report = retriever.ingest(&documents).await?;
        info!("Preloaded {} chunks", report.vector_chunks);
    }

    let context = match forced_route {
        Some(route) => retriever.retrieve_with_route(&args.query, route).await,
        None => retriever.retrieve(&args.query).await,
    };

    let answer = if args.answer {
        let llm = retriever
            .llm()
            .context("--answer needs an LLM API key (llm.api_key or GROQ_API_KEY)")?;
        Some(AnswerGenerator::new(llm).generate(&args.query, &context).await?)
    } else {
        None
    };

    if args.json {
        let output = serde_json::json!({ "context": context, "answer": answer });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_context(&args.query, &context);
        if let Some(answer) = answer {
            println!("=== Answer ===\n\n{}", answer);
        }
    }
    Ok(())
}

fn print_context(query: &str, context: &RetrievalContext) {
    println!("\n=== Results for '{}' ===", query);
    println!("Route: {} (served: {})\n", context.route, context.effective_route);

    for note in &context.notes {
        println!("! {}", note);
    }

    if context.is_empty() {
        println!("No results found.\n");
        return;
    }

    for (idx, fragment) in context.fragments.iter().enumerate() {
        match &fragment.origin {
            FragmentOrigin::Vector {
                document_id, score, ..
            } => println!("{}. score: {:.3} | source: {}", idx + 1, score, document_id),
            FragmentOrigin::Graph { nodes, triples } => {
                println!("{}. graph: {} nodes, {} edges", idx + 1, nodes, triples)
            }
        }
        println!("   {}\n", truncate(&fragment.text.replace('\n', "\n   "), 600));
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_chars() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("éééé", 2), "éé...");
    }
}
