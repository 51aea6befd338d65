//! Client for the Baidu OCR REST API.
//!
//! The client is an ordinary value: build one with [`BaiduOcr::connect`] and
//! pass it to whatever needs to recognize text. Nothing here is global.

use std::{collections::BTreeMap, time::Duration};

use base64::{Engine as _, engine::general_purpose};
use reqwest::blocking as reqwest;
use serde::Deserialize;
use tracing::debug;

use crate::error::OcrError;

pub type Params = BTreeMap<String, String>;

const BASE_URL: &str = "https://aip.baidubce.com";
const API_KEY_VAR: &str = "BAIDU_OCR_API_KEY";
const SECRET_KEY_VAR: &str = "BAIDU_OCR_SECRET_KEY";

/// Anything that turns an encoded image into lines of text.
pub trait Recognize {
    /// Returns the recognized fragments in reading order. An empty list means
    /// the service found no text.
    fn recognize(&self, image: &[u8], params: &Params) -> Result<Vec<String>, OcrError>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OcrMode {
    /// General text, low accuracy, high daily quota.
    #[default]
    Basic,
    /// General text, high accuracy, low daily quota.
    Accurate,
    /// Text in web images.
    Web,
}

impl OcrMode {
    fn path(self) -> &'static str {
        match self {
            OcrMode::Basic => "/rest/2.0/ocr/v1/general_basic",
            OcrMode::Accurate => "/rest/2.0/ocr/v1/accurate_basic",
            OcrMode::Web => "/rest/2.0/ocr/v1/webimage",
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub secret_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, OcrError> {
        let api_key =
            std::env::var(API_KEY_VAR).map_err(|_| OcrError::MissingCredential(API_KEY_VAR))?;
        let secret_key = std::env::var(SECRET_KEY_VAR)
            .map_err(|_| OcrError::MissingCredential(SECRET_KEY_VAR))?;
        Ok(Self {
            api_key,
            secret_key,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Word {
    pub words: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OcrResponse {
    pub words_result: Option<Vec<Word>>,
    pub error_code: Option<i64>,
    pub error_msg: Option<String>,
}

impl OcrResponse {
    pub fn into_words(self) -> Result<Vec<String>, OcrError> {
        match self.words_result {
            Some(words) => Ok(words.into_iter().map(|w| w.words).collect()),
            None => Err(OcrError::Service {
                code: self.error_code.unwrap_or(-1),
                message: self
                    .error_msg
                    .unwrap_or_else(|| "response has no words_result".to_owned()),
            }),
        }
    }
}

/// Form body for a recognition request: the base64 image plus extra params.
pub fn request_form(image: &[u8], params: &Params) -> Vec<(String, String)> {
    let mut form = vec![("image".to_owned(), general_purpose::STANDARD.encode(image))];
    form.extend(
        params
            .iter()
            .filter(|(k, _)| k.as_str() != "image")
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    form
}

#[derive(Debug)]
pub struct BaiduOcr {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    mode: OcrMode,
}

impl BaiduOcr {
    pub fn connect(credentials: &Credentials, mode: OcrMode) -> Result<Self, OcrError> {
        Self::connect_to(BASE_URL, credentials, mode)
    }

    /// Connects to a different API host, e.g. a proxy.
    pub fn connect_to(
        base_url: impl Into<String>,
        credentials: &Credentials,
        mode: OcrMode,
    ) -> Result<Self, OcrError> {
        let base_url = base_url.into();
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .timeout(Duration::from_secs(60))
            .build()?;

        let res: TokenResponse = client
            .post(format!("{}/oauth/2.0/token", base_url))
            .query(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.api_key.as_str()),
                ("client_secret", credentials.secret_key.as_str()),
            ])
            .send()?
            .json()?;

        let access_token = match res.access_token {
            Some(token) => token,
            None => {
                return Err(OcrError::Auth(
                    res.error_description
                        .or(res.error)
                        .unwrap_or_else(|| "no access_token in response".to_owned()),
                ));
            }
        };
        debug!(?mode, "obtained OCR access token");

        Ok(Self {
            client,
            base_url,
            access_token,
            mode,
        })
    }
}

impl Recognize for BaiduOcr {
    fn recognize(&self, image: &[u8], params: &Params) -> Result<Vec<String>, OcrError> {
        let res: OcrResponse = self
            .client
            .post(format!("{}{}", self.base_url, self.mode.path()))
            .query(&[("access_token", self.access_token.as_str())])
            .form(&request_form(image, params))
            .send()?
            .json()?;
        let words = res.into_words()?;
        debug!(fragments = words.len(), mode = ?self.mode, "recognized image");
        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_in_order() {
        let res: OcrResponse = serde_json::from_str(
            r#"{"log_id": 1, "words_result_num": 2,
                "words_result": [{"words": "ab12"}, {"words": "x"}]}"#,
        )
        .unwrap();
        assert_eq!(res.into_words().unwrap(), vec!["ab12", "x"]);
    }

    #[test]
    fn no_text_is_empty_not_error() {
        let res: OcrResponse =
            serde_json::from_str(r#"{"words_result_num": 0, "words_result": []}"#).unwrap();
        assert!(res.into_words().unwrap().is_empty());
    }

    #[test]
    fn error_body_is_failure() {
        let res: OcrResponse = serde_json::from_str(
            r#"{"error_code": 17, "error_msg": "Open api daily request limit reached"}"#,
        )
        .unwrap();
        match res.into_words() {
            Err(OcrError::Service { code, message }) => {
                assert_eq!(code, 17);
                assert!(message.contains("daily"));
            }
            other => panic!("expected service error, got {:?}", other),
        }
    }

    #[test]
    fn form_carries_image_and_params() {
        let mut params = Params::new();
        params.insert("language_type".into(), "ENG".into());
        params.insert("image".into(), "ignored".into());

        let form = request_form(b"abc", &params);
        assert_eq!(
            form,
            vec![
                ("image".to_owned(), "YWJj".to_owned()),
                ("language_type".to_owned(), "ENG".to_owned()),
            ]
        );
    }

    #[test]
    fn secret_is_not_printed() {
        let credentials = Credentials {
            api_key: "key".into(),
            secret_key: "hunter2".into(),
        };
        assert!(!format!("{:?}", credentials).contains("hunter2"));
    }
}
