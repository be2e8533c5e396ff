use std::fmt::{self, Display, Formatter};

use crate::{
    constants,
    jiotv::catalog::{self, Channel},
    router::plugin_url,
};

const SEPARATOR_WIDTH: usize = 40;

//(label, action, enabled)
const SERVICES: [(&str, &str, bool); 7] = [
    ("JioTV", "jiotv", true),
    ("JioHotstar", "hotstar", false),
    ("SonyLIV", "sonyliv", false),
    ("Zee5", "zee5", false),
    ("ETV Win", "etvwin", false),
    ("Sun NXT", "sunnxt", false),
    ("Aha", "aha", false),
];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    Folder,
    Playable,
    Action,
    Separator,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Content {
    Files,
    Videos,
}

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct Art {
    pub icon: Option<String>,
    pub thumb: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListItem {
    pub label: String,
    pub url: String,
    pub kind: Kind,
    pub art: Art,
}

impl ListItem {
    fn new(label: impl Into<String>, url: String, kind: Kind) -> Self {
        Self {
            label: label.into(),
            url,
            kind,
            art: Art::default(),
        }
    }

    pub fn folder(label: impl Into<String>, url: String) -> Self {
        Self::new(label, url, Kind::Folder)
    }

    pub fn action(label: impl Into<String>, url: String) -> Self {
        Self::new(label, url, Kind::Action)
    }

    pub fn separator() -> Self {
        Self::new("─".repeat(SEPARATOR_WIDTH), String::new(), Kind::Separator)
    }

    pub fn channel(channel: &Channel) -> Self {
        let mut item = Self::new(
            channel.name(),
            plugin_url(&[
                ("action", "jiotv_play"),
                ("channel_id", channel.channel_id.as_str()),
            ]),
            Kind::Playable,
        );

        item.art = Art {
            icon: channel.logo_url.clone(),
            thumb: channel.logo_url.clone(),
        };

        item
    }
}

impl Display for ListItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let marker = match self.kind {
            Kind::Folder => "[+]",
            Kind::Playable => "[>]",
            Kind::Action => "[*]",
            Kind::Separator => return f.write_str(&self.label),
        };

        write!(f, "{marker} {:<30} {}", self.label, self.url)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directory {
    pub category: String,
    pub content: Content,
    pub items: Vec<ListItem>,
}

impl Display for Directory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.category)?;
        if self.items.is_empty() {
            return writeln!(f, "  (empty)");
        }

        for item in &self.items {
            writeln!(f, "  {item}")?;
            if self.content == Content::Videos {
                if let Some(art) = item.art.thumb.as_ref().or(item.art.icon.as_ref()) {
                    writeln!(f, "      {art}")?;
                }
            }
        }

        Ok(())
    }
}

impl Directory {
    fn new(category: impl Into<String>, content: Content, items: Vec<ListItem>) -> Self {
        Self {
            category: category.into(),
            content,
            items,
        }
    }

    pub fn main() -> Self {
        let mut items: Vec<ListItem> = SERVICES
            .iter()
            .map(|&(label, action, enabled)| {
                if enabled {
                    ListItem::folder(label, plugin_url(&[("action", action)]))
                } else {
                    ListItem::action(
                        format!("{label} (Coming Soon)"),
                        plugin_url(&[("action", "coming_soon"), ("service", label)]),
                    )
                }
            })
            .collect();

        items.push(ListItem::separator());
        items.push(ListItem::action(
            "Settings",
            plugin_url(&[("action", "settings")]),
        ));

        Self::new(constants::PLUGIN_NAME, Content::Files, items)
    }

    pub fn jiotv(logged_in: bool) -> Self {
        if !logged_in {
            return Self::new(
                "JioTV",
                Content::Files,
                vec![ListItem::action(
                    "Login with OTP",
                    plugin_url(&[("action", "jiotv_login")]),
                )],
            );
        }

        Self::new(
            "JioTV",
            Content::Files,
            vec![
                ListItem::folder(
                    "Live TV by Category",
                    plugin_url(&[("action", "jiotv_categories")]),
                ),
                ListItem::folder(
                    "Live TV by Language",
                    plugin_url(&[("action", "jiotv_languages")]),
                ),
                ListItem::folder(
                    format!("{} Channels", catalog::DEFAULT_LANGUAGE),
                    plugin_url(&[
                        ("action", "jiotv_channels"),
                        ("language", catalog::DEFAULT_LANGUAGE),
                    ]),
                ),
                ListItem::folder(
                    "All Channels",
                    plugin_url(&[("action", "jiotv_channels")]),
                ),
                ListItem::action("Logout", plugin_url(&[("action", "jiotv_logout")])),
            ],
        )
    }

    pub fn categories() -> Self {
        let items = catalog::CATEGORIES
            .iter()
            .map(|&(name, id)| {
                ListItem::folder(
                    name,
                    plugin_url(&[
                        ("action", "jiotv_channels"),
                        ("category", id.to_string().as_str()),
                    ]),
                )
            })
            .collect();

        Self::new("Categories", Content::Files, items)
    }

    pub fn languages() -> Self {
        let items = catalog::LANGUAGES
            .iter()
            .map(|&(name, _)| {
                ListItem::folder(
                    name,
                    plugin_url(&[("action", "jiotv_channels"), ("language", name)]),
                )
            })
            .collect();

        Self::new("Languages", Content::Files, items)
    }

    pub fn channels(heading: impl Into<String>, channels: &[Channel]) -> Self {
        Self::new(
            heading,
            Content::Videos,
            channels.iter().map(ListItem::channel).collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jiotv::tests::CHANNELS;

    fn labels(directory: &Directory) -> Vec<&str> {
        directory.items.iter().map(|i| i.label.as_str()).collect()
    }

    #[test]
    fn main_menu() {
        let menu = Directory::main();
        assert_eq!(menu.category, "RevTV");
        assert_eq!(menu.content, Content::Files);
        assert_eq!(menu.items.len(), 9);

        assert_eq!(menu.items[0].kind, Kind::Folder);
        assert_eq!(menu.items[0].url, "plugin://plugin.video.revtv/?action=jiotv");

        let sony = &menu.items[2];
        assert_eq!(sony.label, "SonyLIV (Coming Soon)");
        assert_eq!(sony.kind, Kind::Action);
        assert_eq!(
            sony.url,
            "plugin://plugin.video.revtv/?action=coming_soon&service=SonyLIV"
        );
        assert_eq!(
            menu.items[5].url,
            "plugin://plugin.video.revtv/?action=coming_soon&service=Sun+NXT"
        );

        assert_eq!(menu.items[7].kind, Kind::Separator);
        assert!(menu.items[7].url.is_empty());
        assert_eq!(menu.items[8].label, "Settings");
    }

    #[test]
    fn jiotv_menu() {
        let menu = Directory::jiotv(false);
        assert_eq!(labels(&menu), ["Login with OTP"]);
        assert_eq!(
            menu.items[0].url,
            "plugin://plugin.video.revtv/?action=jiotv_login"
        );

        let menu = Directory::jiotv(true);
        assert_eq!(
            labels(&menu),
            [
                "Live TV by Category",
                "Live TV by Language",
                "Telugu Channels",
                "All Channels",
                "Logout"
            ]
        );
        assert_eq!(
            menu.items[2].url,
            "plugin://plugin.video.revtv/?action=jiotv_channels&language=Telugu"
        );
    }

    #[test]
    fn fixed_lists() {
        let categories = Directory::categories();
        assert_eq!(categories.items.len(), 13);
        assert_eq!(categories.items[6].label, "News");
        assert_eq!(
            categories.items[6].url,
            "plugin://plugin.video.revtv/?action=jiotv_channels&category=12"
        );

        let languages = Directory::languages();
        assert_eq!(languages.items.len(), 16);
        assert!(
            languages
                .items
                .iter()
                .all(|i| i.kind == Kind::Folder && i.url.ends_with(&i.label))
        );
    }

    #[test]
    fn channel_list() {
        let channels = catalog::parse_channels(CHANNELS).unwrap();
        let list = Directory::channels("All Channels", &channels);

        assert_eq!(list.content, Content::Videos);
        assert_eq!(
            labels(&list),
            ["Colors HD", "ETV Telugu", "TV9 Telugu", "Unknown"]
        );
        assert!(list.items.iter().all(|i| i.kind == Kind::Playable));
        assert_eq!(
            list.items[1].url,
            "plugin://plugin.video.revtv/?action=jiotv_play&channel_id=1235"
        );
        assert_eq!(list.items[1].art.thumb.as_deref(), Some("ETV_Telugu.png"));
        assert_eq!(list.items[2].art, Art::default());
    }

    #[test]
    fn render() {
        let rendered = Directory::jiotv(false).to_string();
        assert!(rendered.starts_with("JioTV\n"));
        assert!(rendered.contains("[*] Login with OTP"));
        assert!(rendered.ends_with("?action=jiotv_login\n"));

        assert_eq!(
            Directory::channels("News Channels", &[]).to_string(),
            "News Channels\n  (empty)\n"
        );

        let channels = catalog::parse_channels(CHANNELS).unwrap();
        let rendered = Directory::channels("All Channels", &channels[..2]).to_string();
        assert_eq!(rendered.lines().count(), 5);
        assert_eq!(rendered.lines().nth(2), Some("      Colors_HD.png"));
        assert_eq!(ListItem::separator().to_string().chars().count(), 40);
    }
}
