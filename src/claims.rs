//! 令牌载荷解码（仅用于展示）
//!
//! 不校验签名，结果只用于填充用户资料缓存，绝不参与鉴权。

use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use battwatch_shared::UserProfile;
use serde::Deserialize;

/// 从令牌中提取的展示字段
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DisplayClaims {
    pub u_id: Option<i64>,
    pub username: Option<String>,
    pub email: Option<String>,
}

impl DisplayClaims {
    pub fn into_profile(self) -> UserProfile {
        UserProfile {
            u_id: self.u_id,
            username: self.username.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            ..Default::default()
        }
    }
}

/// 展示用载荷解码能力，可替换或移除而不影响鉴权逻辑
pub trait ClaimsDecoder {
    fn decode_display_claims(&self, token: &str) -> Option<DisplayClaims>;
}

/// JWT (`header.payload.signature`) 载荷解码
#[derive(Debug, Clone, Copy, Default)]
pub struct JwtClaimsDecoder;

impl ClaimsDecoder for JwtClaimsDecoder {
    fn decode_display_claims(&self, token: &str) -> Option<DisplayClaims> {
        let mut parts = token.split('.');
        let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }

        // 有的签发方会保留 `=` 填充
        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .or_else(|_| URL_SAFE.decode(payload))
            .ok()?;
        let claims: DisplayClaims = serde_json::from_slice(&bytes).ok()?;

        if claims == DisplayClaims::default() {
            None
        } else {
            Some(claims)
        }
    }
}

/// 不解码任何内容
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClaims;

impl ClaimsDecoder for NoClaims {
    fn decode_display_claims(&self, _token: &str) -> Option<DisplayClaims> {
        None
    }
}

#[cfg(test)]
pub(crate) fn make_jwt(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.signature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decodes_payload_fields() {
        let token = make_jwt(&json!({"u_id": 9, "username": "amy", "email": "a@b.com", "exp": 1}));
        let claims = JwtClaimsDecoder.decode_display_claims(&token).unwrap();
        assert_eq!(claims.u_id, Some(9));
        assert_eq!(claims.username.as_deref(), Some("amy"));

        let profile = claims.into_profile();
        assert_eq!(profile.email, "a@b.com");
        assert!(profile.role.is_none());
    }

    #[test]
    fn test_opaque_tokens_yield_none() {
        for token in ["", "opaque", "a.b", "a.!!!.c", "a.b.c.d"] {
            assert!(
                JwtClaimsDecoder.decode_display_claims(token).is_none(),
                "token = {token:?}"
            );
        }
    }

    #[test]
    fn test_payload_without_display_fields() {
        let token = make_jwt(&json!({"sub": "x"}));
        assert!(JwtClaimsDecoder.decode_display_claims(&token).is_none());
    }
}
