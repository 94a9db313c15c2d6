//! SAV enterprise information element registry.
//!
//! Identifiers and display names for the private information elements the
//! export carries, plus the template identifiers that distinguish record
//! shapes in the line-oriented object export.

/// Private enterprise number under which the SAV elements are registered.
pub(crate) const SAV_ENTERPRISE_ID: u32 = 6871;

/// Element sub-id of the rule-type element.
pub(crate) const IE_RULE_TYPE: u16 = 1;
/// Element sub-id of the target-type element.
pub(crate) const IE_TARGET_TYPE: u16 = 2;
/// Element sub-id of the matched-content sub-template list.
pub(crate) const IE_MATCHED_CONTENT_LIST: u16 = 3;
/// Element sub-id of the policy-action element.
pub(crate) const IE_POLICY_ACTION: u16 = 4;

/// Key under which the object export carries enterprise element payloads.
pub(crate) const ALIEN_ELEMENT_KEY: &str = "_alienInformationElement";

/// Key prefix of the main data-record template in the object export.
pub(crate) const MAIN_TEMPLATE_KEY: &str = "template:0x02bc";
/// Key prefix of the nested mapping-list template in the object export.
pub(crate) const MAPPING_TEMPLATE_KEY: &str = "template:0x0258";
/// Key prefix announcing a template definition line.
pub(crate) const TEMPLATE_RECORD_KEY: &str = "template_record:";

/// Verdict-class codes carried by the rule-type element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RuleType {
    Allowlist,
    Blocklist,
    Prefix,
    AsPath,
}

impl RuleType {
    pub(crate) fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Allowlist),
            1 => Some(Self::Blocklist),
            2 => Some(Self::Prefix),
            3 => Some(Self::AsPath),
            _ => None,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Allowlist => "allowlist",
            Self::Blocklist => "blocklist",
            Self::Prefix => "prefix",
            Self::AsPath => "aspath",
        }
    }
}

/// Label for a rule-type code. Codes outside the enumeration are `unknown`.
pub(crate) fn rule_type_name(code: u8) -> &'static str {
    RuleType::from_code(code).map_or("unknown", RuleType::name)
}

/// Display name for a target-type code. Summary output only; the canonical
/// model passes the raw code through.
pub(crate) fn target_type_name(code: u8) -> &'static str {
    match code {
        0 => "interface-based",
        1 => "prefix-based",
        _ => "unknown",
    }
}

/// Display name for a policy-action code. Summary output only.
pub(crate) fn policy_action_name(code: u8) -> &'static str {
    match code {
        0 => "permit",
        1 => "discard",
        2 => "rate-limit",
        3 => "redirect",
        _ => "unknown",
    }
}

/// One row of the element listing printed by `--elements`.
pub(crate) struct InfoElement {
    pub(crate) name: &'static str,
    pub(crate) element_id: u16,
    pub(crate) length: &'static str,
    pub(crate) data_type: &'static str,
    pub(crate) description: &'static str,
}

pub(crate) const SAV_INFO_ELEMENTS: &[InfoElement] = &[
    InfoElement {
        name: "savRuleType",
        element_id: IE_RULE_TYPE,
        length: "1",
        data_type: "unsigned8",
        description: "SAV rule type (allowlist=0, blocklist=1, prefix=2, aspath=3)",
    },
    InfoElement {
        name: "savTargetType",
        element_id: IE_TARGET_TYPE,
        length: "1",
        data_type: "unsigned8",
        description: "SAV target type (interface-based=0, prefix-based=1)",
    },
    InfoElement {
        name: "savMatchedContentList",
        element_id: IE_MATCHED_CONTENT_LIST,
        length: "var",
        data_type: "subTemplateList",
        description: "SAV matched content sub-template list",
    },
    InfoElement {
        name: "savPolicyAction",
        element_id: IE_POLICY_ACTION,
        length: "1",
        data_type: "unsigned8",
        description: "SAV policy action (permit=0, discard=1, rate-limit=2, redirect=3)",
    },
];
