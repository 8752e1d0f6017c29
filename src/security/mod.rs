//! 자격 증명 획득 창구
//!
//! 비밀번호는 프롬프트가 뜬 순간에만 [`CredentialProvider::obtain`]으로 받아
//! 자식 프로세스 stdin에 쓰고 바로 버린다. 어떤 구조체에도 저장하지 않는다.

use crate::error::Result;
use secrecy::SecretString;
use std::sync::Arc;

/// 지갑 비밀번호 공급자. 프롬프트 한 번에 최대 한 번 호출된다.
pub trait CredentialProvider: Send + Sync {
    fn obtain(&self) -> Result<SecretString>;
}

/// 실행기/드라이버에 넘기는 공유 핸들 (입력창은 블로킹 스레드에서 돈다)
pub type SharedCredentials = Arc<dyn CredentialProvider>;

impl<F> CredentialProvider for F
where
    F: Fn() -> Result<SecretString> + Send + Sync,
{
    fn obtain(&self) -> Result<SecretString> {
        self()
    }
}
