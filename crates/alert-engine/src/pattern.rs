//! 메시지 패턴 매칭 — 로그인 실패/성공 판별 휴리스틱
//!
//! 원본 로그 메시지에서 인증 실패/성공을 판별하는 조건을 명시적이고
//! 주입 가능한 값으로 분리합니다. 기본 패턴은 순서 있는 부분 문자열
//! 매칭("login" 뒤에 "failed" 등, 대소문자 무관)이며, 필요하면 정규식으로
//! 교체할 수 있습니다.
//!
//! 부분 문자열 매칭은 느슨한 휴리스틱입니다. 과잉 매칭과 과소 매칭이
//! 모두 가능하며, 보장이 아니라 판별 규칙으로 취급해야 합니다.

use regex::Regex;

use crate::error::AlertEngineError;

/// 메시지 판별 패턴
///
/// 패턴은 phrase 그룹들의 OR로 평가됩니다. 하나의 phrase 그룹은
/// 메시지 안에 순서대로 나타나야 하는 부분 문자열의 나열입니다.
/// 정규식이 설정된 경우 정규식이 phrase 그룹 대신 사용됩니다.
#[derive(Debug, Clone)]
pub struct MessagePattern {
    /// phrase 그룹 (소문자로 정규화되어 저장)
    phrases: Vec<Vec<String>>,
    /// 정규식 대안 (설정 시 phrase 대신 사용)
    regex: Option<Regex>,
}

impl MessagePattern {
    /// phrase 그룹으로 패턴을 만듭니다.
    ///
    /// 각 그룹은 순서대로 나타나야 하는 부분 문자열들입니다.
    /// 그룹 중 하나라도 일치하면 매칭입니다.
    pub fn phrases(groups: &[&[&str]]) -> Self {
        Self {
            phrases: groups
                .iter()
                .map(|group| group.iter().map(|s| s.to_lowercase()).collect())
                .collect(),
            regex: None,
        }
    }

    /// 정규식으로 패턴을 만듭니다.
    pub fn with_regex(pattern: &str) -> Result<Self, AlertEngineError> {
        Ok(Self {
            phrases: Vec::new(),
            regex: Some(Regex::new(pattern)?),
        })
    }

    /// 로그인 실패 기본 패턴: "login…failed" 또는 "authentication…failed"
    pub fn login_failure() -> Self {
        Self::phrases(&[&["login", "failed"], &["authentication", "failed"]])
    }

    /// 로그인 성공 기본 패턴: "login…success"
    pub fn login_success() -> Self {
        Self::phrases(&[&["login", "success"]])
    }

    /// 메시지가 패턴에 일치하는지 판별합니다.
    pub fn matches(&self, message: &str) -> bool {
        if let Some(ref regex) = self.regex {
            return regex.is_match(message);
        }

        let lower = message.to_lowercase();
        self.phrases
            .iter()
            .any(|group| Self::ordered_contains(&lower, group))
    }

    /// `needles`가 `haystack` 안에 순서대로 나타나는지 확인합니다.
    fn ordered_contains(haystack: &str, needles: &[String]) -> bool {
        let mut pos = 0;
        for needle in needles {
            match haystack[pos..].find(needle.as_str()) {
                Some(idx) => pos += idx + needle.len(),
                None => return false,
            }
        }
        true
    }
}
