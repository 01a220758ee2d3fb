//! Legal-tier classification of documents by file name.
//!
//! Vietnamese legal instruments form a fixed hierarchy (Hiến pháp first, then
//! Luật, Pháp lệnh, Nghị định, Thông tư, local decisions...). The tier of a
//! document is derived from its display name every time ordering is needed and
//! is never stored, so changes to the rule table apply to existing documents
//! immediately.
//!
//! Classification walks [`rules`] in order and returns the tier of the first
//! rule whose predicate matches. Names that match nothing get
//! [`Rank::UNRANKED`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Priority tier of a legal document. Lower is more authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rank(u8);

impl Rank {
    /// Constitution.
    pub const CONSTITUTION: Rank = Rank(1);
    /// A "Quyết định" whose issuing authority could not be determined.
    pub const UNCLASSIFIED_DECISION: Rank = Rank(16);
    /// Nothing matched.
    pub const UNRANKED: Rank = Rank(99);

    /// Wrap a raw tier number.
    pub const fn new(tier: u8) -> Self {
        Self(tier)
    }

    /// Raw tier number.
    pub const fn tier(self) -> u8 {
        self.0
    }

    /// Display label for this tier.
    pub fn label(self) -> &'static str {
        rank_label(self)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the classification table.
pub struct RankRule {
    /// Tier assigned when the rule matches.
    pub rank: Rank,
    /// Short description used in logs and tests.
    pub description: &'static str,
    predicate: fn(&str) -> bool,
}

impl RankRule {
    /// Evaluate the rule against an already normalized name.
    pub fn matches(&self, normalized: &str) -> bool {
        (self.predicate)(normalized)
    }
}

impl fmt::Debug for RankRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RankRule")
            .field("rank", &self.rank)
            .field("description", &self.description)
            .finish()
    }
}

static LAW_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\s)luật(\s|$)").expect("valid regex"));

static ORDER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|\s)lệnh(\s|$)").expect("valid regex"));

fn is_standing_committee(name: &str) -> bool {
    name.contains("ủy ban thường vụ") || name.contains("ubtvqh")
}

fn constitution(name: &str) -> bool {
    name.contains("hiến pháp")
}

fn national_assembly(name: &str) -> bool {
    name.contains("bộ luật")
        || LAW_TOKEN.is_match(name)
        || (name.contains("nghị quyết") && name.contains("quốc hội") && !is_standing_committee(name))
}

fn standing_committee(name: &str) -> bool {
    name.contains("pháp lệnh") || (name.contains("nghị quyết") && is_standing_committee(name))
}

fn president(name: &str) -> bool {
    ORDER_TOKEN.is_match(name) || (name.contains("quyết định") && name.contains("chủ tịch nước"))
}

fn government_decree(name: &str) -> bool {
    name.contains("nghị định") || name.contains("/nđ-cp")
}

fn prime_minister(name: &str) -> bool {
    name.contains("quyết định") && (name.contains("thủ tướng") || name.contains("/qđ-ttg"))
}

fn supreme_court_council(name: &str) -> bool {
    name.contains("nghị quyết") && name.contains("hội đồng thẩm phán")
}

fn circular(name: &str) -> bool {
    name.contains("thông tư") || name.contains("/tt-")
}

fn ministry_of_industry_decision(name: &str) -> bool {
    name.contains("quyết định") && (name.contains("bộ công thương") || name.contains("/qđ-bct"))
}

fn provincial_council(name: &str) -> bool {
    name.contains("nghị quyết")
        && (name.contains("hđnd") || name.contains("hội đồng nhân dân"))
        && name.contains("tỉnh")
}

fn provincial_committee(name: &str) -> bool {
    name.contains("quyết định")
        && (name.contains("ubnd") || name.contains("ủy ban nhân dân"))
        && name.contains("tỉnh")
}

fn any_decision(name: &str) -> bool {
    name.contains("quyết định")
}

static RULES: &[RankRule] = &[
    RankRule {
        rank: Rank(1),
        description: "Hiến pháp",
        predicate: constitution,
    },
    RankRule {
        rank: Rank(2),
        description: "Bộ luật, Luật, Nghị quyết Quốc hội",
        predicate: national_assembly,
    },
    RankRule {
        rank: Rank(3),
        description: "Pháp lệnh, Nghị quyết UBTVQH",
        predicate: standing_committee,
    },
    RankRule {
        rank: Rank(4),
        description: "Lệnh, Quyết định Chủ tịch nước",
        predicate: president,
    },
    RankRule {
        rank: Rank(5),
        description: "Nghị định",
        predicate: government_decree,
    },
    RankRule {
        rank: Rank(6),
        description: "Quyết định Thủ tướng",
        predicate: prime_minister,
    },
    RankRule {
        rank: Rank(7),
        description: "Nghị quyết Hội đồng Thẩm phán TANDTC",
        predicate: supreme_court_council,
    },
    RankRule {
        rank: Rank(8),
        description: "Thông tư",
        predicate: circular,
    },
    // Ministerial price decisions sit with circulars, above local documents
    RankRule {
        rank: Rank(8),
        description: "Quyết định Bộ Công Thương",
        predicate: ministry_of_industry_decision,
    },
    RankRule {
        rank: Rank(9),
        description: "Nghị quyết HĐND tỉnh",
        predicate: provincial_council,
    },
    RankRule {
        rank: Rank(10),
        description: "Quyết định UBND tỉnh",
        predicate: provincial_committee,
    },
    RankRule {
        rank: Rank::UNCLASSIFIED_DECISION,
        description: "Quyết định không rõ cấp ban hành",
        predicate: any_decision,
    },
];

/// The ordered classification table. First match wins.
pub fn rules() -> &'static [RankRule] {
    RULES
}

/// NFC-compose and lower-case a name, then fold the two spellings of "ủy"/"uỷ".
///
/// Rule patterns are precomposed, and names from macOS file systems are not.
pub fn normalize_name(name: &str) -> String {
    name.nfc()
        .collect::<String>()
        .to_lowercase()
        .replace("uỷ", "ủy")
}

/// Classify a document name into its legal tier.
pub fn classify(name: &str) -> Rank {
    let normalized = normalize_name(name);
    RULES
        .iter()
        .find(|rule| rule.matches(&normalized))
        .map(|rule| rule.rank)
        .unwrap_or(Rank::UNRANKED)
}

/// Display label for a tier; unknown tiers get a generic label.
pub fn rank_label(rank: Rank) -> &'static str {
    match rank.tier() {
        1 => "Hiến pháp",
        2 => "Luật/NQ Quốc hội",
        3 => "Pháp lệnh/NQ UBTVQH",
        4 => "Lệnh/QĐ CTN",
        5 => "Nghị định",
        6 => "QĐ Thủ tướng",
        7 => "NQ HĐTP TANDTC",
        8 => "Thông tư/QĐ Bộ",
        9 => "NQ HĐND tỉnh",
        10 => "QĐ UBND tỉnh",
        _ => "Văn bản khác",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constitution() {
        assert_eq!(classify("Hiến pháp 2013.pdf"), Rank::CONSTITUTION);
        assert_eq!(classify("HIẾN PHÁP nước CHXHCN Việt Nam.docx"), Rank::new(1));
    }

    #[test]
    fn test_law_as_standalone_token() {
        assert_eq!(classify("Luật Giáo dục.pdf"), Rank::new(2));
        assert_eq!(classify("LUẬT ĐIỆN LỰC 2024.pdf"), Rank::new(2));
        assert_eq!(classify("Bộ luật Dân sự 2015.docx"), Rank::new(2));
        assert_eq!(classify("van ban luật sửa đổi.txt"), Rank::new(2));
    }

    #[test]
    fn test_decomposed_names_classify_like_composed_ones() {
        assert_eq!(classify("Lua\u{323}\u{302}t Gia\u{301}o du\u{323}c.pdf"), Rank::new(2));
        assert_eq!(
            classify("Nghị quyết 1023 của Uy\u{309} ban thường vụ Quốc hội.pdf"),
            Rank::new(3)
        );
        assert_eq!(
            normalize_name("Lua\u{323}\u{302}t"),
            normalize_name("Luật")
        );
    }

    #[test]
    fn test_law_inside_word_is_not_a_law() {
        assert_eq!(classify("luật.pdf"), Rank::UNRANKED);
        assert_eq!(classify("phápluật tổng hợp.txt"), Rank::UNRANKED);
    }

    #[test]
    fn test_resolutions_by_issuer() {
        assert_eq!(classify("Nghị quyết 55 của Quốc hội.pdf"), Rank::new(2));
        assert_eq!(
            classify("Nghị quyết 1023 của Ủy ban thường vụ Quốc hội.pdf"),
            Rank::new(3)
        );
        assert_eq!(classify("Nghị quyết UBTVQH 2023.pdf"), Rank::new(3));
        assert_eq!(
            classify("Nghị quyết 04 Hội đồng Thẩm phán.pdf"),
            Rank::new(7)
        );
        assert_eq!(
            classify("Nghị quyết HĐND tỉnh Bình Dương.pdf"),
            Rank::new(9)
        );
    }

    #[test]
    fn test_standing_committee_spelling_variants() {
        assert_eq!(
            classify("Nghị quyết Uỷ ban thường vụ Quốc hội 2022.pdf"),
            Rank::new(3)
        );
    }

    #[test]
    fn test_ordinance_and_presidential_order() {
        assert_eq!(classify("Pháp lệnh Ưu đãi người có công.pdf"), Rank::new(3));
        // First match wins: the standalone "luật" outranks the "lệnh" token
        assert_eq!(classify("Lệnh công bố luật Đất đai.pdf"), Rank::new(2));
        assert_eq!(classify("Lệnh 05 công bố.pdf"), Rank::new(4));
        assert_eq!(
            classify("Quyết định của Chủ tịch nước về đặc xá.pdf"),
            Rank::new(4)
        );
    }

    #[test]
    fn test_decrees_and_decisions() {
        assert_eq!(classify("Nghị định 72.pdf"), Rank::new(5));
        assert_eq!(classify("72/2025/NĐ-CP.pdf"), Rank::new(5));
        assert_eq!(classify("Quyết định 28 của Thủ tướng.pdf"), Rank::new(6));
        assert_eq!(classify("Quyết định 28/2014/QĐ-TTg.pdf"), Rank::new(6));
    }

    #[test]
    fn test_circulars_and_ministry_decisions() {
        assert_eq!(classify("Thông tư 13.pdf"), Rank::new(8));
        assert_eq!(classify("16/2014/TT-BCT.docx"), Rank::new(8));
        assert_eq!(classify("Quyết định 1279/QĐ-BCT.pdf"), Rank::new(8));
        assert_eq!(classify("Quyết định của Bộ Công Thương.pdf"), Rank::new(8));
    }

    #[test]
    fn test_provincial_decisions() {
        assert_eq!(
            classify("Quyết định UBND tỉnh Đồng Nai.pdf"),
            Rank::new(10)
        );
        assert_eq!(
            classify("Quyết định Ủy ban nhân dân tỉnh Lào Cai.pdf"),
            Rank::new(10)
        );
    }

    #[test]
    fn test_unclassified_decision_keeps_its_own_tier() {
        assert_eq!(
            classify("Quyết định 15 của Giám đốc.pdf"),
            Rank::UNCLASSIFIED_DECISION
        );
    }

    #[test]
    fn test_unmatched_names_are_unranked() {
        assert_eq!(classify(""), Rank::UNRANKED);
        assert_eq!(classify("hợp đồng mua bán điện.pdf"), Rank::UNRANKED);
        assert_eq!(classify("notes.txt"), Rank::UNRANKED);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let name = "Thông tư 16/2014/TT-BCT quy định giá điện.pdf";
        let first = classify(name);
        for _ in 0..10 {
            assert_eq!(classify(name), first);
        }
    }

    #[test]
    fn test_rule_table_order() {
        let tiers: Vec<u8> = rules().iter().map(|r| r.rank.tier()).collect();
        assert_eq!(tiers, vec![1, 2, 3, 4, 5, 6, 7, 8, 8, 9, 10, 16]);
        // The catch-all decision rule must stay last
        let last = rules().last().map(|r| r.rank);
        assert_eq!(last, Some(Rank::UNCLASSIFIED_DECISION));
    }

    #[test]
    fn test_each_rule_in_isolation() {
        let samples = [
            ("hiến pháp", 0),
            ("bộ luật hình sự", 1),
            ("pháp lệnh", 2),
            ("quyết định chủ tịch nước", 3),
            ("nghị định 10", 4),
            ("quyết định thủ tướng", 5),
            ("nghị quyết hội đồng thẩm phán", 6),
            ("thông tư 01", 7),
            ("quyết định bộ công thương", 8),
            ("nghị quyết hđnd tỉnh", 9),
            ("quyết định ubnd tỉnh", 10),
            ("quyết định", 11),
        ];
        for (name, index) in samples {
            assert!(
                rules()[index].matches(name),
                "rule {} ({}) should match '{}'",
                index,
                rules()[index].description,
                name
            );
        }
    }

    #[test]
    fn test_rank_label() {
        assert_eq!(rank_label(Rank::new(1)), "Hiến pháp");
        assert_eq!(rank_label(Rank::new(8)), "Thông tư/QĐ Bộ");
        assert_eq!(Rank::new(5).label(), "Nghị định");
        assert_eq!(rank_label(Rank::UNCLASSIFIED_DECISION), "Văn bản khác");
        assert_eq!(rank_label(Rank::UNRANKED), "Văn bản khác");
        assert_eq!(rank_label(Rank::new(0)), "Văn bản khác");
        assert_eq!(rank_label(Rank::new(255)), "Văn bản khác");
    }

    #[test]
    fn test_rank_ordering_and_display() {
        assert!(Rank::new(2) < Rank::new(5));
        assert!(Rank::UNCLASSIFIED_DECISION < Rank::UNRANKED);
        assert_eq!(Rank::new(8).to_string(), "8");
    }
}
