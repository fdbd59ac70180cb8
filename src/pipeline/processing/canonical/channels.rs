//! Distribution channel headings from Part V Tables 100 and 102.
//!
//! The asterisk variants are footnote markers in the published headings and
//! are significant: "Others*" is the corporate-agent "others" column, while the
//! bare "Others" heading is the residual channel.

pub const CHANNEL_VARIANTS: &[(&str, &str)] = &[
    ("individual agents", "Individual Agents"),
    ("corporate agents - banks", "Corporate Agents - Banks"),
    ("corporate agents banks", "Corporate Agents - Banks"),
    ("banks", "Corporate Agents - Banks"),
    ("corporate agents - others", "Corporate Agents - Others"),
    ("corporate agents others", "Corporate Agents - Others"),
    ("others*", "Corporate Agents - Others"),
    ("brokers", "Brokers"),
    ("direct selling", "Direct Selling"),
    ("mi agents", "MI Agents"),
    ("common service centres", "CSCs"),
    ("common service centres (cscs)", "CSCs"),
    ("cscs", "CSCs"),
    ("web aggregators", "Web Aggregators"),
    ("imf", "IMF"),
    ("online", "Online"),
    ("online**", "Online"),
    ("point of sales", "POS"),
    ("point of sales (pos)", "POS"),
    ("pos", "POS"),
    ("others if any", "Others"),
    ("others", "Others"),
    ("referrals", "Referrals"),
];
