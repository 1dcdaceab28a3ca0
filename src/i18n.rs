use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    En,
    Hi,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Hi];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Some(Language::En),
            "hi" | "hindi" => Some(Language::Hi),
            _ => None,
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Language::En => Language::Hi,
            Language::Hi => Language::En,
        }
    }

    fn table(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Language::En => EN,
            Language::Hi => HI,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

const EN: &[(&str, &str)] = &[
    ("blog_title", "Daily AI Research"),
    (
        "blog_subtitle",
        "Exploring the latest AI applications in social service, agriculture, health, and education from around the globe.",
    ),
    ("read_more", "Read Full Article →"),
    ("archives", "Archives"),
    ("archives_hint", "Older articles, grouped by category"),
    ("archive_title", "Article Archive"),
    ("archive_empty", "No archived articles yet."),
    ("listen", "🔊 Listen"),
    ("stop", "⏹ Stop"),
    ("close", "Close"),
    ("narration_unavailable", "Audio is unavailable on this system."),
    ("banner_dismissed", "Banner hidden for this session."),
    ("language_switched", "Language: English"),
    (
        "help_keys",
        "←/→/↑/↓ move · Enter open · Space listen · Esc close · b hide banner · L language · q quit",
    ),
];

const HI: &[(&str, &str)] = &[
    ("blog_title", "दैनिक एआई अनुसंधान"),
    (
        "blog_subtitle",
        "दुनिया भर से सामाजिक सेवा, कृषि, स्वास्थ्य और शिक्षा में नवीनतम एआई अनुप्रयोगों की खोज।",
    ),
    ("read_more", "पूरा लेख पढ़ें →"),
    ("archives", "संग्रह"),
    ("archives_hint", "पुराने लेख, श्रेणी के अनुसार"),
    ("archive_title", "लेख संग्रह"),
    ("archive_empty", "अभी कोई पुराना लेख नहीं है।"),
    ("listen", "🔊 सुनें"),
    ("stop", "⏹ रोकें"),
    ("close", "बंद करें"),
    ("narration_unavailable", "इस सिस्टम पर ऑडियो उपलब्ध नहीं है।"),
    ("banner_dismissed", "इस सत्र के लिए बैनर छिपा दिया गया।"),
    ("language_switched", "भाषा: हिन्दी"),
];

/// Looks `key` up for `lang`, falling back to English and then to the key.
pub fn text(lang: Language, key: &str) -> &str {
    lookup(lang.table(), key)
        .or_else(|| lookup(EN, key))
        .unwrap_or(key)
}

fn lookup(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, value)| *value)
}
