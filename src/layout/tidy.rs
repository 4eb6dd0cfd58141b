//! Tidy tree placement (Reingold-Tilford with Buchheim's linear-time
//! apportioning), over an index arena.

#[derive(Debug, Clone)]
struct TidyNode {
    parent: Option<usize>,
    children: Vec<usize>,
    number: usize,
    depth: usize,
    prelim: f32,
    modifier: f32,
    change: f32,
    shift: f32,
    thread: Option<usize>,
    ancestor: usize,
    default_ancestor: Option<usize>,
    x: f32,
    y: f32,
}

impl TidyNode {
    fn new(index: usize, parent: Option<usize>, number: usize, depth: usize) -> Self {
        Self {
            parent,
            children: Vec::new(),
            number,
            depth,
            prelim: 0.0,
            modifier: 0.0,
            change: 0.0,
            shift: 0.0,
            thread: None,
            ancestor: index,
            default_ancestor: None,
            x: 0.0,
            y: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TidyTree {
    nodes: Vec<TidyNode>,
}

impl Default for TidyTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TidyTree {
    pub const ROOT: usize = 0;

    pub fn new() -> Self {
        Self {
            nodes: vec![TidyNode::new(0, None, 0, 0)],
        }
    }

    pub fn add_child(&mut self, parent: usize) -> usize {
        let index = self.nodes.len();
        let number = self.nodes[parent].children.len();
        let depth = self.nodes[parent].depth + 1;
        self.nodes.push(TidyNode::new(index, Some(parent), number, depth));
        self.nodes[parent].children.push(index);
        index
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn depth(&self, node: usize) -> usize {
        self.nodes[node].depth
    }

    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|node| node.depth).max().unwrap_or(0)
    }

    /// `(breadth, depth)` after [`TidyTree::layout`].
    pub fn position(&self, node: usize) -> (f32, f32) {
        (self.nodes[node].x, self.nodes[node].y)
    }

    /// Place every node so breadth spans `[0, breadth]` and the deepest level
    /// sits at `depth`.
    pub fn layout(&mut self, breadth: f32, depth: f32) {
        self.first_walk(Self::ROOT);
        let root_shift = -self.nodes[Self::ROOT].prelim;
        self.second_walk(Self::ROOT, root_shift);

        let mut left = Self::ROOT;
        let mut right = Self::ROOT;
        let mut bottom = Self::ROOT;
        for (idx, node) in self.nodes.iter().enumerate() {
            if node.x < self.nodes[left].x {
                left = idx;
            }
            if node.x > self.nodes[right].x {
                right = idx;
            }
            if node.depth > self.nodes[bottom].depth {
                bottom = idx;
            }
        }
        let s = if left == right {
            1.0
        } else {
            self.separation(left, right) / 2.0
        };
        let tx = s - self.nodes[left].x;
        let kx = breadth / (self.nodes[right].x + s + tx);
        let ky = depth / self.nodes[bottom].depth.max(1) as f32;
        for node in &mut self.nodes {
            node.x = (node.x + tx) * kx;
            node.y = node.depth as f32 * ky;
        }
    }

    fn separation(&self, a: usize, b: usize) -> f32 {
        if self.nodes[a].parent == self.nodes[b].parent {
            1.0
        } else {
            2.0
        }
    }

    fn previous_sibling(&self, v: usize) -> Option<usize> {
        let node = &self.nodes[v];
        let parent = node.parent?;
        if node.number == 0 {
            return None;
        }
        self.nodes[parent].children.get(node.number - 1).copied()
    }

    fn next_left(&self, v: usize) -> Option<usize> {
        self.nodes[v].children.first().copied().or(self.nodes[v].thread)
    }

    fn next_right(&self, v: usize) -> Option<usize> {
        self.nodes[v].children.last().copied().or(self.nodes[v].thread)
    }

    fn first_walk(&mut self, v: usize) {
        let children = self.nodes[v].children.clone();
        for &child in &children {
            self.first_walk(child);
        }
        let w = self.previous_sibling(v);
        if let (Some(&first), Some(&last)) = (children.first(), children.last()) {
            self.execute_shifts(v);
            let midpoint = (self.nodes[first].prelim + self.nodes[last].prelim) / 2.0;
            if let Some(w) = w {
                self.nodes[v].prelim = self.nodes[w].prelim + self.separation(v, w);
                self.nodes[v].modifier = self.nodes[v].prelim - midpoint;
            } else {
                self.nodes[v].prelim = midpoint;
            }
        } else if let Some(w) = w {
            self.nodes[v].prelim = self.nodes[w].prelim + self.separation(v, w);
        }
        if let Some(parent) = self.nodes[v].parent {
            let fallback = self.nodes[parent].children[0];
            let ancestor = self.nodes[parent].default_ancestor.unwrap_or(fallback);
            let ancestor = self.apportion(v, w, ancestor);
            self.nodes[parent].default_ancestor = Some(ancestor);
        }
    }

    fn second_walk(&mut self, v: usize, parent_modifier: f32) {
        self.nodes[v].x = self.nodes[v].prelim + parent_modifier;
        self.nodes[v].modifier += parent_modifier;
        let modifier = self.nodes[v].modifier;
        let children = self.nodes[v].children.clone();
        for child in children {
            self.second_walk(child, modifier);
        }
    }

    fn apportion(&mut self, v: usize, w: Option<usize>, mut ancestor: usize) -> usize {
        let Some(w) = w else {
            return ancestor;
        };
        let Some(parent) = self.nodes[v].parent else {
            return ancestor;
        };
        let mut vop = v;
        let mut vom = self.nodes[parent].children[0];
        let mut sip = self.nodes[v].modifier;
        let mut sop = self.nodes[v].modifier;
        let mut sim = self.nodes[w].modifier;
        let mut som = self.nodes[vom].modifier;

        let mut inner_left = self.next_right(w);
        let mut inner_right = self.next_left(v);
        while let (Some(vim), Some(vip)) = (inner_left, inner_right) {
            let (Some(next_vom), Some(next_vop)) = (self.next_left(vom), self.next_right(vop)) else {
                break;
            };
            vom = next_vom;
            vop = next_vop;
            self.nodes[vop].ancestor = v;
            let shift = self.nodes[vim].prelim + sim - self.nodes[vip].prelim - sip
                + self.separation(vim, vip);
            if shift > 0.0 {
                let wm = self.next_ancestor(vim, v, ancestor);
                self.move_subtree(wm, v, shift);
                sip += shift;
                sop += shift;
            }
            sim += self.nodes[vim].modifier;
            sip += self.nodes[vip].modifier;
            som += self.nodes[vom].modifier;
            sop += self.nodes[vop].modifier;
            inner_left = self.next_right(vim);
            inner_right = self.next_left(vip);
        }

        if let Some(vim) = inner_left
            && self.next_right(vop).is_none()
        {
            self.nodes[vop].thread = Some(vim);
            self.nodes[vop].modifier += sim - sop;
        }
        if let Some(vip) = inner_right
            && self.next_left(vom).is_none()
        {
            self.nodes[vom].thread = Some(vip);
            self.nodes[vom].modifier += sip - som;
            ancestor = v;
        }
        ancestor
    }

    fn next_ancestor(&self, vim: usize, v: usize, ancestor: usize) -> usize {
        let candidate = self.nodes[vim].ancestor;
        if self.nodes[candidate].parent == self.nodes[v].parent {
            candidate
        } else {
            ancestor
        }
    }

    fn move_subtree(&mut self, wm: usize, wp: usize, shift: f32) {
        let span = self.nodes[wp].number as f32 - self.nodes[wm].number as f32;
        let change = shift / span.max(1.0);
        self.nodes[wp].change -= change;
        self.nodes[wp].shift += shift;
        self.nodes[wm].change += change;
        self.nodes[wp].prelim += shift;
        self.nodes[wp].modifier += shift;
    }

    fn execute_shifts(&mut self, v: usize) {
        let mut shift = 0.0;
        let mut change = 0.0;
        let children = self.nodes[v].children.clone();
        for &child in children.iter().rev() {
            let node = &mut self.nodes[child];
            node.prelim += shift;
            node.modifier += shift;
            change += node.change;
            shift += node.shift + change;
        }
    }
}
