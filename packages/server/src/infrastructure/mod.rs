//! Infrastructure 層
//!
//! ドメイン層が定義する trait の具体的な実装と、外部とのワイヤフォーマットを扱う。

pub mod broadcaster;
pub mod dto;
pub mod repository;
pub mod signature;
