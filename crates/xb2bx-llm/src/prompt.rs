// Prompt templates for the market-intelligence calls.
//
// Each builder takes only the values the call needs and returns a plain
// string; the system instructions are fixed per persona.

use xb2bx_core::model::Role;

// ---------------------------------------------------------------------------
// System instructions
// ---------------------------------------------------------------------------

/// Persona for grounded product research.
pub const RESEARCH_SYSTEM: &str = "You are the XB2BX Market Intelligence Agent. \
Provide high-density, technical trade analysis. Use Markdown.";

/// Persona for the dashboard insight line.
pub const ADVISOR_SYSTEM: &str = "You are the XB2BX Strategic AI Advisor. \
Be sharp, professional, and insightful like a Bloomberg analyst.";

/// Persona for drafting RFQ specifications.
pub const PROCUREMENT_SYSTEM: &str = "You are an elite procurement officer. \
Be concise and technical.";

// ---------------------------------------------------------------------------
// User prompts
// ---------------------------------------------------------------------------

pub fn research_prompt(query: &str) -> String {
    format!(
        "Perform professional B2B market research for: \"{query}\".\n\
         Analyze:\n\
         1. Current global price trends.\n\
         2. Key manufacturing regions.\n\
         3. Major supply chain risks for 2024-2025."
    )
}

pub fn specs_prompt(product_name: &str) -> String {
    format!(
        "Generate a professional, technical B2B specification list for: \"{product_name}\". \
         Include materials, grade, and compliance certifications."
    )
}

pub fn image_prompt(product_name: &str) -> String {
    format!(
        "A professional, high-quality, studio-lit commercial product render of: {product_name}. \
         Neutral grey background, industrial style, 4k resolution."
    )
}

pub fn smart_matches_prompt(role: Role, interests: &[String]) -> String {
    format!(
        "Based on a {role} role and interests in {}, suggest 4 specific trending trade keywords. \
         Return as a comma-separated list only.",
        interests.join(", ")
    )
}

pub fn insights_prompt(role: Role, rfq_count: usize) -> String {
    format!(
        "Strategic insight for {role} in B2B marketplace with {rfq_count} active RFQs. \
         Highlight one specific trend."
    )
}

pub fn opportunity_prompt(product: &str, specs: &str) -> String {
    format!(
        "Analyze this trade opportunity: Product: {product}. Specs: {specs}. \
         Provide a 3-point summary: Market Demand, Technical Difficulty, and Value Rating."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn research_prompt_quotes_query() {
        let p = research_prompt("cold rolled steel");
        assert!(p.contains("\"cold rolled steel\""));
        assert!(p.contains("3. Major supply chain risks"));
    }

    #[test]
    fn smart_matches_lists_interests() {
        let p = smart_matches_prompt(Role::Seller, &["steel".into(), "copper".into()]);
        assert!(p.starts_with("Based on a seller role and interests in steel, copper,"));
        assert!(p.ends_with("comma-separated list only."));
    }

    #[test]
    fn insights_mentions_count_and_role() {
        let p = insights_prompt(Role::Buyer, 7);
        assert!(p.contains("for buyer in B2B marketplace with 7 active RFQs"));
    }

    #[test]
    fn opportunity_includes_product_and_specs() {
        let p = opportunity_prompt("Copper wire", "99.9% Cu");
        assert!(p.contains("Product: Copper wire. Specs: 99.9% Cu."));
    }
}
