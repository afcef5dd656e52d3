//! Built-in knowledge base ingested at startup.

/// Metadata `source` value for the built-in facts.
pub const DEFAULT_SOURCE: &str = "knowledge_base";

/// Facts about Arrow Conveyancing available before any content is ingested.
pub const DEFAULT_FACTS: [&str; 6] = [
    "Arrow Conveyancing offers residential and commercial property legal services with fixed fees.",
    "They specialize in conveyancing, property transactions, and legal advice for buyers and sellers.",
    "Arrow Conveyancing promises transparent pricing with no hidden costs.",
    "Their experienced legal team handles all aspects of property law and conveyancing.",
    "Contact Arrow Conveyancing through their website at arrowconveyancing.co.uk for quotes.",
    "They provide expert legal support for property purchases, sales, and remortgaging.",
];
