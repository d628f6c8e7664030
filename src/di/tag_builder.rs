use crate::component::Interface;
use crate::service::{ServiceTag, TagOption};

/// Derives tag names from interface names and renders tag queries
#[derive(Debug, Default, Clone, Copy)]
pub struct TagBuilder;

impl TagBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Tag name of an interface: `app::LoggerInterface` becomes `logger`,
    /// `dyn EventSubscriber` becomes `event-subscriber`
    pub fn interface_name(interface: &str) -> String {
        let interface = interface.trim();
        let interface = interface.strip_prefix("dyn ").unwrap_or(interface);
        let segment = interface
            .rsplit(|c: char| c == ':' || c == '\\')
            .next()
            .unwrap_or(interface);
        let segment = match segment.strip_suffix("Interface") {
            Some(stem) if !stem.is_empty() => stem,
            _ => segment,
        };

        let mut name = String::with_capacity(segment.len() + 4);
        for (i, c) in segment.chars().enumerate() {
            if c.is_uppercase() {
                if i > 0 {
                    name.push('-');
                }
                name.extend(c.to_lowercase());
            } else {
                name.push(c);
            }
        }
        name
    }

    /// Tag name for a user-given subject: interface-looking names are converted,
    /// tag names are kept as they are
    pub fn subject(name: &str) -> String {
        if name.contains("::") || name.contains('\\') || name.chars().any(char::is_uppercase) {
            Self::interface_name(name)
        } else {
            name.to_string()
        }
    }

    pub fn tag(&self, name: &str, options: &[TagOption]) -> ServiceTag {
        ServiceTag::new(name).with_options(options)
    }

    pub fn from_interface(&self, interface: &str, options: &[TagOption]) -> ServiceTag {
        self.tag(&Self::interface_name(interface), options)
    }

    /// One tag per interface, duplicates removed
    pub fn from_interfaces<'a>(
        &self,
        interfaces: impl IntoIterator<Item = &'a str>,
        options: &[TagOption],
    ) -> Vec<ServiceTag> {
        let mut tags: Vec<ServiceTag> = Vec::new();
        for interface in interfaces {
            let tag = self.from_interface(interface, options);
            if !tags.iter().any(|known| known.name() == tag.name()) {
                tags.push(tag);
            }
        }
        tags
    }

    /// Query string selecting every service tagged `name`
    pub fn query(&self, name: &str, options: &[TagOption]) -> String {
        self.tag(name, options).full_name()
    }

    pub fn query_from_interface(&self, interface: &str, options: &[TagOption]) -> String {
        self.from_interface(interface, options).full_name()
    }

    /// Query string selecting every implementor of `I`
    pub fn query_for<I: ?Sized + Interface>(&self, options: &[TagOption]) -> String {
        self.query_from_interface(I::NAME, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_names_are_kebab_cased() {
        assert_eq!(TagBuilder::interface_name("LoggerInterface"), "logger");
        assert_eq!(TagBuilder::interface_name("app::log::LoggerInterface"), "logger");
        assert_eq!(TagBuilder::interface_name("App\\Log\\LoggerInterface"), "logger");
        assert_eq!(
            TagBuilder::interface_name("dyn EventSubscriber"),
            "event-subscriber"
        );
        assert_eq!(TagBuilder::interface_name("Interface"), "interface");
        assert_eq!(TagBuilder::interface_name("cache"), "cache");
    }

    #[test]
    fn subjects_keep_tag_names() {
        assert_eq!(TagBuilder::subject("event-subscriber"), "event-subscriber");
        assert_eq!(TagBuilder::subject("MailerInterface"), "mailer");
    }

    #[test]
    fn queries_carry_their_options() {
        let tags = TagBuilder::new();
        assert_eq!(tags.query("logger", &[]), "#logger");
        assert_eq!(
            tags.query_from_interface("LoggerInterface", &[TagOption::ServiceTargeted]),
            "@service_of_#logger"
        );
        assert_eq!(
            tags.query("repository", &[TagOption::FromClass]),
            "@from_class_#repository"
        );
    }

    #[test]
    fn from_interfaces_removes_duplicates() {
        let tags = TagBuilder::new().from_interfaces(["Logger", "LoggerInterface", "Clock"], &[]);
        let names: Vec<_> = tags.iter().map(ServiceTag::name).collect();
        assert_eq!(names, ["logger", "clock"]);
    }
}
