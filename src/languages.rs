//! Supported target languages, text direction, and default-language detection.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::translate::detail::TextDirection;

/// `(code, title)` pairs. The title is what the backend receives as target language.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("nl", "Dutch"),
    ("sv", "Swedish"),
    ("no", "Norwegian"),
    ("da", "Danish"),
    ("fi", "Finnish"),
    ("pl", "Polish"),
    ("cs", "Czech"),
    ("sk", "Slovak"),
    ("hu", "Hungarian"),
    ("ro", "Romanian"),
    ("bg", "Bulgarian"),
    ("hr", "Croatian"),
    ("sl", "Slovenian"),
    ("el", "Greek"),
    ("ru", "Russian"),
    ("uk", "Ukrainian"),
    ("tr", "Turkish"),
    ("ar", "Arabic"),
    ("he", "Hebrew"),
    ("fa", "Persian"),
    ("ur", "Urdu"),
    ("hi", "Hindi"),
    ("bn", "Bengali"),
    ("th", "Thai"),
    ("vi", "Vietnamese"),
    ("id", "Indonesian"),
    ("ms", "Malay"),
    ("tl", "Filipino"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("zh-CN", "Chinese (Simplified)"),
    ("zh-TW", "Chinese (Traditional)"),
];

const RTL_LANGUAGES: &[&str] = &["ar", "he", "fa", "ur", "ps", "sd", "yi", "dv"];

pub const FALLBACK_LANGUAGE: &str = "en";

pub fn language_title(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, title)| *title)
}

pub fn is_supported(code: &str) -> bool {
    language_title(code).is_some()
}

pub fn supported_codes() -> impl Iterator<Item = &'static str> {
    SUPPORTED_LANGUAGES.iter().map(|(code, _)| *code)
}

pub fn is_rtl(code: &str) -> bool {
    RTL_LANGUAGES.contains(&code)
}

pub fn text_direction(code: &str) -> TextDirection {
    if is_rtl(code) {
        TextDirection::Rtl
    } else {
        TextDirection::Ltr
    }
}

/// Main language spoken in a country (ISO 3166-1 alpha-2).
pub fn country_language(country: &str) -> Option<&'static str> {
    let lang = match country.to_ascii_uppercase().as_str() {
        "US" | "CA" | "GB" | "IE" | "SG" | "AU" | "NZ" | "ZA" | "NG" | "GH" | "KE" | "UG"
        | "TZ" | "ZW" | "ZM" | "BW" | "JM" | "TT" | "BZ" | "GY" => "en",
        "MX" | "ES" | "AR" | "CL" | "CO" | "PE" | "VE" | "EC" | "BO" | "PY" | "UY" | "GT"
        | "SV" | "HN" | "NI" | "CR" | "PA" | "CU" | "DO" | "PR" | "AD" => "es",
        "FR" | "BE" | "CH" | "LU" | "MC" | "MQ" | "GP" | "GF" => "fr",
        "DE" | "AT" | "LI" => "de",
        "IT" | "SM" | "VA" => "it",
        "PT" | "BR" | "AO" | "MZ" | "CV" => "pt",
        "RU" | "BY" | "KZ" | "KG" => "ru",
        "NL" | "SR" | "AW" | "CW" => "nl",
        "PL" => "pl",
        "SE" => "sv",
        "NO" => "no",
        "DK" => "da",
        "FI" => "fi",
        "CZ" => "cs",
        "SK" => "sk",
        "HU" => "hu",
        "RO" | "MD" => "ro",
        "BG" => "bg",
        "HR" => "hr",
        "SI" => "sl",
        "GR" | "CY" => "el",
        "UA" => "uk",
        "TR" => "tr",
        "JP" => "ja",
        "KR" | "KP" => "ko",
        "CN" => "zh-CN",
        "HK" | "TW" | "MO" => "zh-TW",
        "TH" => "th",
        "VN" => "vi",
        "MY" | "BN" => "ms",
        "ID" => "id",
        "PH" => "tl",
        "BD" => "bn",
        "PK" => "ur",
        "IN" => "hi",
        "IR" => "fa",
        "IL" => "he",
        "SA" | "EG" | "IQ" | "LY" | "TN" | "DZ" | "MA" | "SD" | "YE" | "OM" | "AE" | "QA"
        | "KW" | "BH" | "JO" | "LB" | "SY" | "PS" => "ar",
        _ => return None,
    };
    Some(lang)
}

/// Inputs for [`detect_default_language`], highest priority first.
#[derive(Debug, Clone, Default)]
pub struct LanguageHints {
    /// Language the user picked earlier.
    pub stored: Option<String>,
    /// Country from IP geolocation.
    pub country: Option<String>,
    /// Browser/OS preferred languages, e.g. `["de-AT", "en-US"]`.
    pub preferred: Vec<String>,
    /// UI language of the host application.
    pub ui_language: Option<String>,
}

fn primary_subtag(tag: &str) -> &str {
    tag.split(['-', '_']).next().unwrap_or(tag)
}

/// Stored preference, then IP country, then preferred languages, then UI
/// language, then English.
pub fn detect_default_language(hints: &LanguageHints) -> String {
    if let Some(stored) = hints.stored.as_deref().filter(|s| !s.is_empty()) {
        return stored.to_string();
    }

    if let Some(lang) = hints
        .country
        .as_deref()
        .and_then(country_language)
        .filter(|lang| is_supported(lang))
    {
        debug!(lang, "default_language_from_country");
        return lang.to_string();
    }

    if let Some(lang) = hints
        .preferred
        .iter()
        .map(|tag| primary_subtag(tag))
        .find(|code| is_supported(code))
    {
        return lang.to_string();
    }

    if let Some(lang) = hints
        .ui_language
        .as_deref()
        .map(primary_subtag)
        .filter(|code| is_supported(code))
    {
        return lang.to_string();
    }

    FALLBACK_LANGUAGE.to_string()
}

#[derive(Deserialize)]
struct GeoResponse {
    country_code: Option<String>,
}

/// Country code of the caller's public IP. Any failure yields `None`.
pub async fn locate_country(url: &str, timeout: Duration) -> Option<String> {
    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "geo client build failed");
            return None;
        }
    };
    let response = match client.get(url).send().await {
        Ok(resp) if resp.status().is_success() => resp,
        Ok(resp) => {
            warn!(status = resp.status().as_u16(), "geo lookup rejected");
            return None;
        }
        Err(e) => {
            warn!(error = %e, "geo lookup failed");
            return None;
        }
    };
    match response.json::<GeoResponse>().await {
        Ok(geo) => geo.country_code.filter(|c| !c.is_empty()),
        Err(e) => {
            warn!(error = %e, "geo response undecodable");
            None
        }
    }
}
