use log::debug;

/// Page groups, in the order they appear in the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    Static,
    Interface,
    Pool,
}

/// One menu entry. Dynamic pages are keyed by interface or pool name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Page {
    Appliance,
    System,
    Uptime,
    Interface(String),
    Pool(String),
}

impl Page {
    pub fn category(&self) -> Category {
        match self {
            Page::Appliance | Page::System | Page::Uptime => Category::Static,
            Page::Interface(_) => Category::Interface,
            Page::Pool(_) => Category::Pool,
        }
    }

    fn keyed(category: Category, key: String) -> Option<Self> {
        match category {
            Category::Static => None,
            Category::Interface => Some(Page::Interface(key)),
            Category::Pool => Some(Page::Pool(key)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

/// Circular page list with a cursor.
///
/// Never empty: the static pages are always at the front, so `index` is
/// always valid.
#[derive(Debug, Clone)]
pub struct Menu {
    pages: Vec<Page>,
    index: usize,
}

impl Default for Menu {
    fn default() -> Self {
        Self::new()
    }
}

impl Menu {
    pub fn new() -> Self {
        Self {
            pages: vec![Page::Appliance, Page::System, Page::Uptime],
            index: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    #[cfg(test)]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn current(&self) -> &Page {
        &self.pages[self.index]
    }

    pub fn navigate(&mut self, dir: Direction) -> usize {
        let n = self.pages.len();
        self.index = match dir {
            Direction::Prev => (self.index + n - 1) % n,
            Direction::Next => (self.index + 1) % n,
        };
        debug!("menu {:?} -> {}/{}", dir, self.index, n);
        self.index
    }

    /// Replace every page of `category` with one page per key, in order.
    ///
    /// The cursor follows the page it was on if that page survives the
    /// rebuild, otherwise it keeps its position clamped to the new length.
    /// Static pages cannot be rebuilt.
    pub fn rebuild<I>(&mut self, category: Category, keys: I)
    where
        I: IntoIterator<Item = String>,
    {
        if category == Category::Static {
            return;
        }
        let current = self.current().clone();

        self.pages.retain(|p| p.category() != category);
        let at = self
            .pages
            .iter()
            .position(|p| p.category() > category)
            .unwrap_or(self.pages.len());
        let fresh: Vec<Page> = keys
            .into_iter()
            .filter_map(|key| Page::keyed(category, key))
            .collect();
        let added = fresh.len();
        self.pages.splice(at..at, fresh);

        self.index = self
            .pages
            .iter()
            .position(|p| *p == current)
            .unwrap_or_else(|| self.index.min(self.pages.len() - 1));
        debug!(
            "rebuilt {:?}: {} page(s), cursor {}/{}",
            category,
            added,
            self.index,
            self.pages.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn menu_with(ifaces: &[&str], pools: &[&str]) -> Menu {
        let mut menu = Menu::new();
        menu.rebuild(Category::Interface, names(ifaces));
        menu.rebuild(Category::Pool, names(pools));
        menu
    }

    fn select(menu: &mut Menu, page: &Page) {
        while menu.current() != page {
            menu.navigate(Direction::Next);
        }
    }

    #[test]
    fn starts_on_static_pages() {
        let menu = Menu::new();
        assert_eq!(menu.len(), 3);
        assert_eq!(menu.index(), 0);
        assert_eq!(menu.current(), &Page::Appliance);
    }

    #[test]
    fn navigation_cycles_close() {
        for n_ifaces in 0..4 {
            let mut menu = menu_with(&["eth0", "eth1", "eth2"][..n_ifaces], &["tank"]);
            let n = menu.len();
            menu.navigate(Direction::Next);
            let start = menu.index();
            for _ in 0..n {
                menu.navigate(Direction::Next);
            }
            assert_eq!(menu.index(), start);
            for _ in 0..n {
                menu.navigate(Direction::Prev);
            }
            assert_eq!(menu.index(), start);
        }
    }

    #[test]
    fn navigation_wraps_both_ways() {
        let mut menu = menu_with(&["eth0"], &["tank"]);
        assert_eq!(menu.len(), 5);
        assert_eq!(menu.navigate(Direction::Prev), 4);
        assert_eq!(menu.navigate(Direction::Next), 0);
        assert_eq!(menu.navigate(Direction::Next), 1);
    }

    #[test]
    fn dynamic_pages_keep_category_order() {
        let mut menu = menu_with(&["eth0"], &["tank"]);
        menu.rebuild(Category::Interface, names(&["eth0", "eth1"]));
        assert_eq!(
            menu.pages(),
            &[
                Page::Appliance,
                Page::System,
                Page::Uptime,
                Page::Interface("eth0".into()),
                Page::Interface("eth1".into()),
                Page::Pool("tank".into()),
            ]
        );
    }

    #[test]
    fn empty_rebuild_removes_category() {
        let mut menu = menu_with(&["eth0"], &["tank", "backup"]);
        select(&mut menu, &Page::Pool("backup".into()));
        menu.rebuild(Category::Pool, Vec::new());
        assert_eq!(menu.len(), 4);
        assert!(menu.index() < menu.len());
        assert!(menu.pages().iter().all(|p| p.category() != Category::Pool));
    }

    #[test]
    fn selection_follows_item_when_reordered() {
        let mut menu = menu_with(&[], &["a", "b", "c"]);
        select(&mut menu, &Page::Pool("b".into()));
        menu.rebuild(Category::Pool, names(&["c", "b", "a"]));
        assert_eq!(menu.current(), &Page::Pool("b".into()));
        assert_eq!(menu.index(), 4);
    }

    #[test]
    fn selection_follows_interface_not_position() {
        let mut menu = menu_with(&["eth0"], &[]);
        select(&mut menu, &Page::Interface("eth0".into()));
        menu.rebuild(Category::Interface, names(&["eth1", "eth0"]));
        assert_eq!(menu.current(), &Page::Interface("eth0".into()));
    }

    #[test]
    fn rebuilding_other_category_keeps_selection() {
        let mut menu = menu_with(&["eth0"], &["tank"]);
        select(&mut menu, &Page::Pool("tank".into()));
        menu.rebuild(Category::Interface, names(&["eth0", "eth1", "eth2"]));
        assert_eq!(menu.current(), &Page::Pool("tank".into()));
    }

    #[test]
    fn vanished_selection_clamps() {
        let mut menu = menu_with(&[], &["a", "b", "c"]);
        select(&mut menu, &Page::Pool("c".into()));
        menu.rebuild(Category::Pool, names(&["a"]));
        assert_eq!(menu.index(), menu.len() - 1);
        assert_eq!(menu.current(), &Page::Pool("a".into()));
    }

    #[test]
    fn static_pages_cannot_be_rebuilt() {
        let mut menu = Menu::new();
        menu.rebuild(Category::Static, names(&["x"]));
        assert_eq!(menu.pages(), &[Page::Appliance, Page::System, Page::Uptime]);
    }
}
