//! # Mimizuku CLI Library
//!
//! EL リーナーのコマンドラインインターフェース
//! オントロジーファイルを読み込み、包摂クエリをコマンドラインから実行

pub mod commands;

pub use commands::*;
