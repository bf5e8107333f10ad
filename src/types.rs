use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// How the six numbers of a game are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenType {
    Auto,
    Manual,
    SemiAuto,
}

/// Display names for the gen types, keyed the way the portal prints them
/// on a ticket.
const GEN_TYPE_LABELS: [(GenType, &str); 3] = [
    (GenType::Auto, "자동"),
    (GenType::Manual, "수동"),
    (GenType::SemiAuto, "반자동"),
];

impl GenType {
    /// Numeric code the buy endpoint expects. The manual and semi-auto
    /// codes have been stable across protocol versions; the auto code has
    /// not (`"0"` and `"3"` were both observed), so it comes from config.
    pub fn wire_code(self, auto_code: &str) -> String {
        match self {
            GenType::Auto => auto_code.to_string(),
            GenType::Manual => "1".to_string(),
            GenType::SemiAuto => "2".to_string(),
        }
    }

    pub fn label(self) -> &'static str {
        GEN_TYPE_LABELS
            .iter()
            .find(|(gen_type, _)| *gen_type == self)
            .map(|(_, label)| *label)
            .unwrap_or("?")
    }

    pub fn from_name(name: &str) -> Option<GenType> {
        match name.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(GenType::Auto),
            "manual" => Some(GenType::Manual),
            "semiauto" | "semi-auto" | "semi" => Some(GenType::SemiAuto),
            _ => None,
        }
    }
}

/// One drawn round: winning numbers plus the bonus number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundInfo {
    pub round: i64,
    pub date: String,
    pub numbers: [u8; 6],
    #[serde(rename = "bonusNo")]
    pub bonus_no: u8,
}

/// One game slot of the buy request's `param` field, serialized with the
/// exact field names the portal expects (`alpabet` included).
#[derive(Debug, Clone, Serialize)]
pub struct GameChoice {
    #[serde(rename = "genType")]
    pub gen_type: String,
    #[serde(rename = "arrGameChoiceNum")]
    pub arr_game_choice_num: Option<String>,
    pub alpabet: String,
}

#[derive(Debug, Deserialize)]
pub struct RsaKeyResponse {
    pub data: Option<RsaKeyData>,
}

#[derive(Debug, Deserialize)]
pub struct RsaKeyData {
    #[serde(rename = "rsaModulus")]
    pub rsa_modulus: String,
    #[serde(rename = "publicExponent")]
    pub public_exponent: String,
}

/// Reply of the pre-purchase ready endpoint. Only `ready_ip` feeds the buy
/// request; the rest is carried for logging.
#[derive(Debug, Deserialize)]
pub struct UserReady {
    pub ready_ip: String,
    pub ready_time: Option<String>,
    pub ready_cnt: Option<String>,
    pub direct_yn: Option<String>,
}

/// Top level of the buy endpoint reply. Every flag is optional; which ones
/// are present depends on what went wrong.
#[derive(Debug, Default, Deserialize)]
pub struct BuyResponse {
    #[serde(rename = "loginYn")]
    pub login_yn: Option<String>,
    #[serde(rename = "isAllowed")]
    pub is_allowed: Option<String>,
    #[serde(rename = "isGameManaged")]
    pub is_game_managed: Option<String>,
    #[serde(rename = "checkOltSaleTime")]
    pub check_olt_sale_time: Option<bool>,
    #[serde(rename = "errorMsg")]
    pub error_msg: Option<String>,
    pub result: Option<BuyResult>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BuyResult {
    #[serde(rename = "buyRound", default, deserialize_with = "int_or_string")]
    pub buy_round: i64,
    #[serde(rename = "barCode1", default)]
    pub bar_code1: String,
    #[serde(rename = "barCode2", default)]
    pub bar_code2: String,
    #[serde(rename = "barCode3", default)]
    pub bar_code3: String,
    #[serde(rename = "barCode4", default)]
    pub bar_code4: String,
    #[serde(rename = "barCode5", default)]
    pub bar_code5: String,
    #[serde(rename = "barCode6", default)]
    pub bar_code6: String,
    #[serde(rename = "nBuyAmount", default, deserialize_with = "int_or_string")]
    pub n_buy_amount: i64,
    #[serde(rename = "arrGameChoiceNum", default)]
    pub arr_game_choice_num: Vec<String>,
    #[serde(rename = "resultCode", default)]
    pub result_code: String,
    #[serde(rename = "resultMsg", default)]
    pub result_msg: String,
}

/// Numeric fields of the buy result arrived as strings in one protocol
/// version and as numbers in another.
fn int_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => Ok(n.as_i64().unwrap_or(0)),
        Value::String(s) => Ok(s.trim().parse().unwrap_or(0)),
        _ => Ok(0),
    }
}

/// Everything worth reporting about a completed purchase.
#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    pub round: i64,
    pub amount: i64,
    pub bar_codes: [String; 6],
    pub games: Vec<String>,
    pub numbers: Vec<Vec<u8>>,
    pub remaining: i64,
    pub low_balance: bool,
    pub result_msg: String,
}
