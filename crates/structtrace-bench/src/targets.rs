//! Raw, untraced structure implementations raced by the harness.
//!
//! These are performance-shaped counterparts of the traced trees: no step
//! emission, no snapshots, insert and membership only.

use std::collections::{BTreeMap, HashMap};

use crate::BenchStructureKind;

/// A structure the harness can drive element by element.
pub trait BenchTarget: Send {
    fn insert(&mut self, key: i64);
    fn contains(&self, key: i64) -> bool;
}

/// Build the raw structure for a kind.
pub fn build_target(kind: BenchStructureKind) -> Box<dyn BenchTarget> {
    match kind {
        BenchStructureKind::HashMap => Box::new(HashMapTarget::default()),
        BenchStructureKind::BTree => Box::new(BTreeTarget::default()),
        BenchStructureKind::RbTree => Box::new(RawRbTree::default()),
        BenchStructureKind::AvlTree => Box::new(RawAvlTree::default()),
    }
}

#[derive(Debug, Default)]
struct HashMapTarget(HashMap<i64, i64>);

impl BenchTarget for HashMapTarget {
    fn insert(&mut self, key: i64) {
        self.0.insert(key, key);
    }

    fn contains(&self, key: i64) -> bool {
        self.0.contains_key(&key)
    }
}

#[derive(Debug, Default)]
struct BTreeTarget(BTreeMap<i64, i64>);

impl BenchTarget for BTreeTarget {
    fn insert(&mut self, key: i64) {
        self.0.insert(key, key);
    }

    fn contains(&self, key: i64) -> bool {
        self.0.contains_key(&key)
    }
}

const NIL: usize = usize::MAX;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

struct RawRbNode {
    key: i64,
    color: Color,
    left: usize,
    right: usize,
    parent: usize,
}

/// Untraced arena red-black tree, insert + membership only.
#[derive(Default)]
pub struct RawRbTree {
    nodes: Vec<RawRbNode>,
    root: Option<usize>,
}

impl RawRbTree {
    fn color(&self, i: usize) -> Color {
        if i == NIL {
            Color::Black
        } else {
            self.nodes[i].color
        }
    }

    fn rotate_left(&mut self, x: usize) {
        let y = self.nodes[x].right;
        self.nodes[x].right = self.nodes[y].left;
        if self.nodes[y].left != NIL {
            let yl = self.nodes[y].left;
            self.nodes[yl].parent = x;
        }
        let xp = self.nodes[x].parent;
        self.nodes[y].parent = xp;
        if xp == NIL {
            self.root = Some(y);
        } else if self.nodes[xp].left == x {
            self.nodes[xp].left = y;
        } else {
            self.nodes[xp].right = y;
        }
        self.nodes[y].left = x;
        self.nodes[x].parent = y;
    }

    fn rotate_right(&mut self, y: usize) {
        let x = self.nodes[y].left;
        self.nodes[y].left = self.nodes[x].right;
        if self.nodes[x].right != NIL {
            let xr = self.nodes[x].right;
            self.nodes[xr].parent = y;
        }
        let yp = self.nodes[y].parent;
        self.nodes[x].parent = yp;
        if yp == NIL {
            self.root = Some(x);
        } else if self.nodes[yp].left == y {
            self.nodes[yp].left = x;
        } else {
            self.nodes[yp].right = x;
        }
        self.nodes[x].right = y;
        self.nodes[y].parent = x;
    }

    fn fixup(&mut self, mut z: usize) {
        while self.nodes[z].parent != NIL && self.color(self.nodes[z].parent) == Color::Red {
            let p = self.nodes[z].parent;
            let g = self.nodes[p].parent;
            if g == NIL {
                break;
            }
            if self.nodes[g].left == p {
                let u = self.nodes[g].right;
                if self.color(u) == Color::Red {
                    self.nodes[p].color = Color::Black;
                    self.nodes[u].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    z = g;
                } else {
                    if self.nodes[p].right == z {
                        z = p;
                        self.rotate_left(z);
                    }
                    let p = self.nodes[z].parent;
                    let g = self.nodes[p].parent;
                    self.nodes[p].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    self.rotate_right(g);
                }
            } else {
                let u = self.nodes[g].left;
                if self.color(u) == Color::Red {
                    self.nodes[p].color = Color::Black;
                    self.nodes[u].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    z = g;
                } else {
                    if self.nodes[p].left == z {
                        z = p;
                        self.rotate_right(z);
                    }
                    let p = self.nodes[z].parent;
                    let g = self.nodes[p].parent;
                    self.nodes[p].color = Color::Black;
                    self.nodes[g].color = Color::Red;
                    self.rotate_left(g);
                }
            }
        }
        if let Some(r) = self.root {
            self.nodes[r].color = Color::Black;
        }
    }
}

impl BenchTarget for RawRbTree {
    fn insert(&mut self, key: i64) {
        let mut parent = NIL;
        let mut cur = self.root.unwrap_or(NIL);
        let mut went_left = false;
        while cur != NIL {
            parent = cur;
            if key < self.nodes[cur].key {
                cur = self.nodes[cur].left;
                went_left = true;
            } else if key > self.nodes[cur].key {
                cur = self.nodes[cur].right;
                went_left = false;
            } else {
                return;
            }
        }
        self.nodes.push(RawRbNode {
            key,
            color: Color::Red,
            left: NIL,
            right: NIL,
            parent,
        });
        let z = self.nodes.len() - 1;
        if parent == NIL {
            self.root = Some(z);
        } else if went_left {
            self.nodes[parent].left = z;
        } else {
            self.nodes[parent].right = z;
        }
        self.fixup(z);
    }

    fn contains(&self, key: i64) -> bool {
        let mut cur = self.root.unwrap_or(NIL);
        while cur != NIL {
            if key == self.nodes[cur].key {
                return true;
            }
            cur = if key < self.nodes[cur].key {
                self.nodes[cur].left
            } else {
                self.nodes[cur].right
            };
        }
        false
    }
}

struct RawAvlNode {
    key: i64,
    height: u32,
    left: Option<usize>,
    right: Option<usize>,
}

/// Untraced arena AVL tree, insert + membership only.
#[derive(Default)]
pub struct RawAvlTree {
    nodes: Vec<RawAvlNode>,
    root: Option<usize>,
}

impl RawAvlTree {
    fn height(&self, node: Option<usize>) -> u32 {
        node.map_or(0, |i| self.nodes[i].height)
    }

    fn update_height(&mut self, i: usize) {
        self.nodes[i].height =
            1 + self.height(self.nodes[i].left).max(self.height(self.nodes[i].right));
    }

    fn balance(&self, i: usize) -> i32 {
        self.height(self.nodes[i].left) as i32 - self.height(self.nodes[i].right) as i32
    }

    fn rotate_right(&mut self, y: usize) -> usize {
        let Some(x) = self.nodes[y].left else { return y };
        self.nodes[y].left = self.nodes[x].right;
        self.nodes[x].right = Some(y);
        self.update_height(y);
        self.update_height(x);
        x
    }

    fn rotate_left(&mut self, x: usize) -> usize {
        let Some(y) = self.nodes[x].right else { return x };
        self.nodes[x].right = self.nodes[y].left;
        self.nodes[y].left = Some(x);
        self.update_height(x);
        self.update_height(y);
        y
    }

    fn insert_node(&mut self, node: Option<usize>, key: i64) -> usize {
        let Some(i) = node else {
            self.nodes.push(RawAvlNode {
                key,
                height: 1,
                left: None,
                right: None,
            });
            return self.nodes.len() - 1;
        };

        if key < self.nodes[i].key {
            let l = self.insert_node(self.nodes[i].left, key);
            self.nodes[i].left = Some(l);
        } else if key > self.nodes[i].key {
            let r = self.insert_node(self.nodes[i].right, key);
            self.nodes[i].right = Some(r);
        } else {
            return i;
        }

        self.update_height(i);
        let balance = self.balance(i);
        if balance > 1 {
            if let Some(l) = self.nodes[i].left {
                if key > self.nodes[l].key {
                    let nl = self.rotate_left(l);
                    self.nodes[i].left = Some(nl);
                }
                return self.rotate_right(i);
            }
        }
        if balance < -1 {
            if let Some(r) = self.nodes[i].right {
                if key < self.nodes[r].key {
                    let nr = self.rotate_right(r);
                    self.nodes[i].right = Some(nr);
                }
                return self.rotate_left(i);
            }
        }
        i
    }
}

impl BenchTarget for RawAvlTree {
    fn insert(&mut self, key: i64) {
        let root = self.insert_node(self.root, key);
        self.root = Some(root);
    }

    fn contains(&self, key: i64) -> bool {
        let mut cur = self.root;
        while let Some(i) = cur {
            if key == self.nodes[i].key {
                return true;
            }
            cur = if key < self.nodes[i].key {
                self.nodes[i].left
            } else {
                self.nodes[i].right
            };
        }
        false
    }
}
