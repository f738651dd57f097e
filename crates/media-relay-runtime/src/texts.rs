//! Reply texts shown to users.

/// Static capability message (HTML).
pub const START_TEXT: &str = "🚀 <b>Media Relay Bot</b>\n\n\
Кидай посилання:\n\
• TikTok\n\
• Instagram Reels\n\
• YouTube Shorts\n\
• Pinterest\n\
• Twitter/X\n\n\
<i>Підтримую фото, відео, GIF</i>";

/// Transient status while the downloader runs.
pub const DOWNLOADING_TEXT: &str = "⏳ Завантажую контент...";

/// Status edit when the file exceeds the local limit.
pub const TOO_LARGE_TEXT: &str = "❌ Файл занадто великий (>50MB)";

/// Status edit when nothing could be downloaded.
pub const MISSING_TEXT: &str = "❌ Не вдалося завантажити. Перевір лінк.";

/// Status edit when sending the media failed.
pub const GENERIC_FAILURE_TEXT: &str = "❌ Сталася помилка.";

/// Caption of delivered photos.
pub const PHOTO_CAPTION: &str = "📸 Готово!";

/// Caption of delivered videos.
pub const VIDEO_CAPTION: &str = "🎥 Готово!";
