use std::collections::HashMap;
use std::sync::OnceLock;

use fancy_regex::Regex;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use crate::dom::{Dom, NodeId};
use crate::selector::{query_all, query_one};
use crate::Result;

const CONTAINER_MARGIN: i32 = 16;
const DEFAULT_PRIORITY: i64 = 50;
const DEFAULT_SHORT_LIMIT: usize = 6;
const DEFAULT_SHORT_AT: i32 = 960;

const COMPACT_LEVELS: [(&str, i32); 5] = [
    ("auto-compact", 1250),
    ("auto-compact-md", 1100),
    ("auto-compact-sm", 960),
    ("auto-compact-xs", 720),
    ("auto-compact-xxs", 520),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCategory {
    DesktopXl,
    DesktopLarge,
    DesktopMedium,
    Tablet,
    MobileLarge,
    MobileSmall,
}

impl DeviceCategory {
    pub fn from_viewport(viewport: i32) -> Self {
        if viewport >= 1400 {
            Self::DesktopXl
        } else if viewport >= 1200 {
            Self::DesktopLarge
        } else if viewport >= 992 {
            Self::DesktopMedium
        } else if viewport >= 768 {
            Self::Tablet
        } else if viewport >= 576 {
            Self::MobileLarge
        } else {
            Self::MobileSmall
        }
    }

    pub fn css_name(&self) -> &'static str {
        match self {
            Self::DesktopXl => "desktop-xl",
            Self::DesktopLarge => "desktop-large",
            Self::DesktopMedium => "desktop-medium",
            Self::Tablet => "tablet",
            Self::MobileLarge => "mobile-large",
            Self::MobileSmall => "mobile-small",
        }
    }

    fn is_mobile(&self) -> bool {
        matches!(self, Self::MobileLarge | Self::MobileSmall)
    }
}

struct NavbarSizing {
    link_padding: &'static str,
    font_size: &'static str,
    brand_size: &'static str,
}

fn navbar_sizing(category: DeviceCategory) -> NavbarSizing {
    match category {
        DeviceCategory::DesktopXl => NavbarSizing {
            link_padding: "8px 16px",
            font_size: "1rem",
            brand_size: "1.1rem",
        },
        DeviceCategory::DesktopLarge => NavbarSizing {
            link_padding: "7px 14px",
            font_size: "0.95rem",
            brand_size: "1.05rem",
        },
        DeviceCategory::DesktopMedium => NavbarSizing {
            link_padding: "6px 12px",
            font_size: "0.9rem",
            brand_size: "1rem",
        },
        DeviceCategory::Tablet => NavbarSizing {
            link_padding: "5px 10px",
            font_size: "0.85rem",
            brand_size: "0.95rem",
        },
        DeviceCategory::MobileLarge => NavbarSizing {
            link_padding: "4px 8px",
            font_size: "0.8rem",
            brand_size: "0.9rem",
        },
        DeviceCategory::MobileSmall => NavbarSizing {
            link_padding: "3px 6px",
            font_size: "0.75rem",
            brand_size: "0.85rem",
        },
    }
}

struct BadgeSizing {
    padding: &'static str,
    font_size: &'static str,
}

fn badge_sizing(category: DeviceCategory) -> BadgeSizing {
    match category {
        DeviceCategory::DesktopXl => BadgeSizing {
            padding: "0.5rem 1rem",
            font_size: "0.875rem",
        },
        DeviceCategory::DesktopLarge => BadgeSizing {
            padding: "0.45rem 0.9rem",
            font_size: "0.8rem",
        },
        DeviceCategory::DesktopMedium => BadgeSizing {
            padding: "0.4rem 0.8rem",
            font_size: "0.75rem",
        },
        DeviceCategory::Tablet => BadgeSizing {
            padding: "0.35rem 0.7rem",
            font_size: "0.7rem",
        },
        DeviceCategory::MobileLarge => BadgeSizing {
            padding: "0.3rem 0.6rem",
            font_size: "0.65rem",
        },
        DeviceCategory::MobileSmall => BadgeSizing {
            padding: "0.25rem 0.5rem",
            font_size: "0.6rem",
        },
    }
}

fn avatar_size(category: DeviceCategory) -> Option<&'static str> {
    match category {
        DeviceCategory::MobileSmall => Some("26px"),
        DeviceCategory::MobileLarge => Some("28px"),
        _ => None,
    }
}

#[derive(Debug)]
struct RelocatedItem {
    placeholder: NodeId,
    original: NodeId,
}

/// Every item currently relocated into the overflow menu. Rebuilt from empty
/// on each pass; fully drained before re-measuring so clones never pile up
/// across resizes.
#[derive(Debug, Default)]
pub(crate) struct OverflowState {
    items: Vec<RelocatedItem>,
}

impl OverflowState {
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}

#[derive(Debug, Default)]
pub(crate) struct LayoutEngine {
    pub(crate) overflow: OverflowState,
    pub(crate) pending_frame: Option<i64>,
}

impl LayoutEngine {
    /// One full adaptation pass: device styling, breakpoint classes, text
    /// shortening, threshold hiding, then the relocation pass.
    pub(crate) fn run_adapt_pass(
        &mut self,
        dom: &mut Dom,
        widths: &HashMap<NodeId, i32>,
        viewport: i32,
    ) -> Result<()> {
        self.adapt_for_device(dom, viewport)?;
        apply_compact_levels(dom, viewport)?;
        adapt_short_text(dom, viewport)?;
        apply_hide_below(dom, viewport)?;
        self.relocate_overflow(dom, widths)?;
        Ok(())
    }

    pub(crate) fn relocate_overflow(
        &mut self,
        dom: &mut Dom,
        widths: &HashMap<NodeId, i32>,
    ) -> Result<()> {
        let root = dom.root();
        let Some(container) = query_one(dom, root, ".nav-functional")? else {
            return Ok(());
        };
        let Some(list) = dom.by_id("primaryNavItems") else {
            return Ok(());
        };
        let Some(menu) = dom.by_id("compactExtraMenu") else {
            return Ok(());
        };

        // Restore the canonical all-items-inline layout before measuring.
        self.clear_relocations(dom, menu)?;

        let available = measured_width(dom, widths, container) - CONTAINER_MARGIN;
        let items = query_all(dom, list, "li[data-functional-item]")?;
        if items.is_empty() {
            return Ok(());
        }

        let mut total = 0i32;
        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            dom.remove_class(item, "d-none")?;
            let width = measured_width(dom, widths, item);
            total += width;
            entries.push((item, width, item_priority(dom, item)));
        }

        let wrapper = query_one(dom, root, ".compact-ellipsis-wrapper")?;
        if total <= available {
            if let Some(wrapper) = wrapper {
                dom.remove_class(wrapper, "ellipsis-visible")?;
            }
            return Ok(());
        }

        // Higher priority relocates first; ties keep document order.
        entries.sort_by(|a, b| b.2.cmp(&a.2));

        for (item, width, _) in entries {
            if total <= available {
                break;
            }
            let Some(parent) = dom.parent(item) else {
                continue;
            };

            let placeholder = dom.create_detached_element("li");
            dom.set_attr(placeholder, "class", "functional-placeholder")?;
            dom.style_set(placeholder, "display", "none")?;
            dom.insert_before(parent, placeholder, item)?;

            if let Some(anchor) = query_one(dom, item, "a.nav-link")? {
                let href = dom.attr(anchor, "href").unwrap_or_default();
                let label = dom.text_content(anchor).trim().to_string();
                let clone = dom.create_detached_element("li");
                dom.set_attr(clone, "data-overflow-clone", "1")?;
                let link = dom.create_detached_element("a");
                dom.set_attr(link, "class", "dropdown-item")?;
                dom.set_attr(link, "href", &href)?;
                dom.append_child(clone, link)?;
                dom.set_text_content(link, &label)?;
                dom.append_child(menu, clone)?;
            }

            dom.add_class(item, "d-none")?;
            self.overflow.items.push(RelocatedItem {
                placeholder,
                original: item,
            });
            total -= width;
        }

        if !self.overflow.items.is_empty() {
            if let Some(wrapper) = wrapper {
                dom.add_class(wrapper, "ellipsis-visible")?;
            }
        }
        Ok(())
    }

    fn clear_relocations(&mut self, dom: &mut Dom, menu: NodeId) -> Result<()> {
        for clone in query_all(dom, menu, "li[data-overflow-clone]")? {
            dom.remove_node(clone)?;
        }
        for entry in self.overflow.items.drain(..) {
            dom.remove_class(entry.original, "d-none")?;
            if let Some(parent) = dom.parent(entry.placeholder) {
                dom.insert_before(parent, entry.original, entry.placeholder)?;
                dom.remove_node(entry.placeholder)?;
            }
        }
        if let Some(wrapper) = query_one(dom, dom.root(), ".compact-ellipsis-wrapper")? {
            dom.remove_class(wrapper, "ellipsis-visible")?;
        }
        Ok(())
    }

    fn adapt_for_device(&self, dom: &mut Dom, viewport: i32) -> Result<()> {
        let category = DeviceCategory::from_viewport(viewport);
        debug!(category = category.css_name(), viewport, "device adaptation pass");

        let root = dom.root();
        if let Some(body) = query_one(dom, root, "body")? {
            let mut tokens = dom.class_list(body);
            tokens.retain(|token| !is_device_class(token));
            tokens.push(format!("device-{}", category.css_name()));
            dom.set_class_list(body, &tokens)?;
        }

        self.adapt_navbar(dom, category)?;
        self.adapt_guest_badge(dom, category)?;
        self.adapt_profile_block(dom, category)?;
        self.adapt_ellipsis_button(dom, category)?;
        Ok(())
    }

    fn adapt_navbar(&self, dom: &mut Dom, category: DeviceCategory) -> Result<()> {
        let root = dom.root();
        let Some(navbar) = query_one(dom, root, ".navbar-modern")? else {
            return Ok(());
        };
        let sizing = navbar_sizing(category);

        for link in query_all(dom, navbar, ".nav-link")? {
            dom.style_set_important(link, "padding", sizing.link_padding)?;
            dom.style_set(link, "font-size", sizing.font_size)?;
        }
        if let Some(brand) = query_one(dom, navbar, ".navbar-brand")? {
            dom.style_set(brand, "font-size", sizing.brand_size)?;
        }
        if let Some(brand_text) = query_one(dom, navbar, ".brand-text")? {
            let display = if category.is_mobile() { "none" } else { "inline" };
            dom.style_set(brand_text, "display", display)?;
        }
        Ok(())
    }

    fn adapt_guest_badge(&self, dom: &mut Dom, category: DeviceCategory) -> Result<()> {
        let root = dom.root();
        let Some(badge) = query_one(dom, root, ".guest-badge-fixed .badge")? else {
            return Ok(());
        };
        let sizing = badge_sizing(category);
        dom.style_set_important(badge, "padding", sizing.padding)?;
        dom.style_set_important(badge, "font-size", sizing.font_size)?;
        Ok(())
    }

    fn adapt_profile_block(&self, dom: &mut Dom, category: DeviceCategory) -> Result<()> {
        let root = dom.root();
        if let Some(user_name) = query_one(dom, root, ".nav-profile .user-name")? {
            let hide = category == DeviceCategory::Tablet || category.is_mobile();
            let display = if hide { "none" } else { "inline" };
            dom.style_set_important(user_name, "display", display)?;
        }
        if let Some(avatar) = query_one(dom, root, ".avatar-thumb")? {
            if let Some(size) = avatar_size(category) {
                dom.style_set(avatar, "width", size)?;
                dom.style_set(avatar, "height", size)?;
            }
        }
        Ok(())
    }

    fn adapt_ellipsis_button(&self, dom: &mut Dom, category: DeviceCategory) -> Result<()> {
        let root = dom.root();
        let Some(button) = query_one(dom, root, ".nav-ellipsis-btn")? else {
            return Ok(());
        };
        if category == DeviceCategory::MobileSmall {
            dom.style_set(button, "padding", "3px 8px")?;
            dom.style_set(button, "font-size", "0.8rem")?;
        }
        Ok(())
    }
}

fn apply_compact_levels(dom: &mut Dom, viewport: i32) -> Result<()> {
    let Some(body) = query_one(dom, dom.root(), "body")? else {
        return Ok(());
    };
    for (class, width) in COMPACT_LEVELS {
        if viewport <= width {
            dom.add_class(body, class)?;
        } else {
            dom.remove_class(body, class)?;
        }
    }
    Ok(())
}

fn adapt_short_text(dom: &mut Dom, viewport: i32) -> Result<()> {
    for node in query_all(dom, dom.root(), "[data-short-text]")? {
        let original = match dom.attr(node, "data-original-text") {
            Some(cached) => cached,
            None => {
                let text = dom.text_content(node).trim().to_string();
                dom.set_attr(node, "data-original-text", &text)?;
                text
            }
        };
        let limit = dom
            .attr(node, "data-short-limit")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_SHORT_LIMIT);
        let at = dom
            .attr(node, "data-short-at")
            .and_then(|raw| raw.trim().parse::<i32>().ok())
            .unwrap_or(DEFAULT_SHORT_AT);

        // Count and cut NFC characters so combining sequences survive the cut.
        let normalized: String = original.nfc().collect();
        let char_count = normalized.chars().count();
        if viewport <= at && char_count > limit {
            let mut short: String = normalized.chars().take(limit).collect();
            short.push('…');
            dom.set_text_content(node, &short)?;
        } else {
            dom.set_text_content(node, &original)?;
        }
    }
    Ok(())
}

fn apply_hide_below(dom: &mut Dom, viewport: i32) -> Result<()> {
    for node in query_all(dom, dom.root(), "[data-hide-below]")? {
        let Some(threshold) = dom
            .attr(node, "data-hide-below")
            .and_then(|raw| raw.trim().parse::<i32>().ok())
        else {
            continue;
        };
        if viewport <= threshold {
            dom.add_class(node, "d-none")?;
        } else {
            dom.remove_class(node, "d-none")?;
        }
    }
    Ok(())
}

fn item_priority(dom: &Dom, node: NodeId) -> i64 {
    dom.attr(node, "data-functional-priority")
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_PRIORITY)
}

pub(crate) fn measured_width(dom: &Dom, widths: &HashMap<NodeId, i32>, node: NodeId) -> i32 {
    if let Some(width) = widths.get(&node) {
        return *width;
    }
    dom.attr(node, "data-measured-width")
        .and_then(|raw| raw.trim().parse::<i32>().ok())
        .unwrap_or(0)
}

fn is_device_class(token: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^device-\w+").ok())
        .as_ref()
        .map(|re| re.is_match(token).unwrap_or(false))
        .unwrap_or(false)
}
