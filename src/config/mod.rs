pub mod instructions;
pub mod merged;
pub mod settings;

use settings::Settings;
use std::path::Path;

/// 指示ファイルのパスからsettings.yamlを自動検出して読み込む。
///
/// 指示ファイルと同じディレクトリに `settings.yaml` が存在すれば読み込み、
/// 存在しなければデフォルト設定を返す。
pub fn load_settings_for_instructions(instructions_path: &Path) -> crate::error::Result<Settings> {
    let dir = instructions_path.parent().ok_or_else(|| {
        crate::error::LayerError::config("Cannot determine instruction file directory")
    })?;

    let settings_path = dir.join("settings.yaml");

    if settings_path.exists() {
        Settings::from_file(&settings_path)
    } else {
        Ok(Settings::default())
    }
}
