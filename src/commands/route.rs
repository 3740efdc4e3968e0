use anyhow::Result;

use crate::config::Config;
use crate::router::QueryRouter;

/// Print the routing decision and the rules that matched.
pub fn run(config: &Config, query: &str, json: bool) -> Result<()> {
    let router = QueryRouter::from_config(&config.routing)?;
    let explanation = router.explain(query);

    if json {
        println!("{}", serde_json::to_string_pretty(&explanation)?);
        return Ok(());
    }

    println!("Route: {}", explanation.decision);
    if !explanation.factual_matches.is_empty() {
        println!("  factual:    {}", explanation.factual_matches.join(", "));
    }
    if !explanation.relational_matches.is_empty() {
        println!("  relational: {}", explanation.relational_matches.join(", "));
    }
    Ok(())
}
