use core::fmt;
use core::mem;
use core::ptr::{self, NonNull};

/// A node in the doubly linked list.
///
/// Contains a value and pointers to the previous and next entries.
/// This structure is not meant to be used directly by users of the `List`.
pub struct Entry<T> {
    /// The value stored in this entry. Uses MaybeUninit to allow for sigil nodes.
    val: mem::MaybeUninit<T>,
    /// Pointer to the previous entry in the list.
    prev: *mut Entry<T>,
    /// Pointer to the next entry in the list.
    next: *mut Entry<T>,
}

impl<T> Entry<T> {
    /// Creates a new entry with the given value.
    fn new(val: T) -> Self {
        Entry {
            val: mem::MaybeUninit::new(val),
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        }
    }

    /// Creates a new sigil (sentinel) entry without initializing the value.
    ///
    /// Sigil entries are used as head and tail markers in the list.
    fn new_sigil() -> Self {
        Entry {
            val: mem::MaybeUninit::uninit(),
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        }
    }
}

/// An unbounded doubly linked list with O(1) insertion, removal and
/// repositioning through raw node pointers.
///
/// The list uses sentinel nodes (sigils) at the head and tail to simplify
/// operations. It carries no capacity of its own: the byte-budget store that
/// owns it bounds growth by accounted size, not by entry count, and reclaims
/// nodes from the back.
///
/// Node pointers returned by [`push_front`](List::push_front) stay valid until
/// the node is removed; the owner is responsible for never using a pointer
/// after [`remove`](List::remove), [`pop_back`](List::pop_back) or
/// [`clear`](List::clear) has freed it.
pub struct List<T> {
    /// Current number of items in the list.
    len: usize,
    /// Pointer to the head sentinel node.
    head: *mut Entry<T>,
    /// Pointer to the tail sentinel node.
    tail: *mut Entry<T>,
}

impl<T> List<T> {
    /// Creates a new empty list.
    ///
    /// This sets up the sentinel nodes and links them together.
    pub fn new() -> List<T> {
        let head = Box::into_raw(Box::new(Entry::new_sigil()));
        let tail = Box::into_raw(Box::new(Entry::new_sigil()));

        let list = List { len: 0, head, tail };

        // SAFETY: head and tail are newly allocated and valid pointers
        unsafe {
            (*list.head).next = list.tail;
            (*list.tail).prev = list.head;
        }

        list
    }

    /// Returns the current number of items in the list.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the list contains no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds a value to the front of the list.
    ///
    /// Returns a pointer to the newly created entry. The pointer remains
    /// valid until the entry is removed from the list.
    pub fn push_front(&mut self, v: T) -> *mut Entry<T> {
        // SAFETY: Box::into_raw creates a valid raw pointer and we're using
        // NonNull to assert its non-nullness
        let node = unsafe { NonNull::new_unchecked(Box::into_raw(Box::new(Entry::new(v)))) };
        // SAFETY: node is a newly allocated entry that is not part of any list yet
        unsafe { self.attach_front(node.as_ptr()) };
        self.len += 1;
        node.as_ptr()
    }

    /// Removes the last (least recently used) item from the list and returns
    /// its value.
    ///
    /// Returns `None` if the list is empty.
    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        // SAFETY: head and tail are valid pointers initialized in `new`, and
        // the list is not empty, so there is at least one element between them
        let prev = unsafe { (*self.tail).prev };
        if prev == self.head {
            return None;
        }
        // SAFETY: prev is a data node owned by this list; after detaching it,
        // reclaiming the Box and extracting the initialized value is sound
        unsafe {
            self.detach(prev);
            self.len -= 1;
            let node = Box::from_raw(prev);
            Some(node.val.assume_init())
        }
    }

    /// Removes the given node from the list and returns its value.
    ///
    /// Returns `None` for null or sentinel pointers.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `node` is either null, a sentinel, or a
    /// valid pointer to a node currently in this list (not freed, not in
    /// another list).
    pub unsafe fn remove(&mut self, node: *mut Entry<T>) -> Option<T> {
        if node.is_null() || node == self.head || node == self.tail {
            return None;
        }
        // SAFETY: the caller guarantees node is a live entry of this list, so
        // it was allocated by `push_front` and holds an initialized value
        unsafe {
            self.detach(node);
            self.len -= 1;
            let node = Box::from_raw(node);
            Some(node.val.assume_init())
        }
    }

    /// Moves a node to the front of the list (after the head sentinel).
    ///
    /// Null and sentinel pointers are ignored.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `node` is either null, a sentinel, or a
    /// valid pointer to a node currently in this list.
    pub unsafe fn move_to_front(&mut self, node: *mut Entry<T>) {
        if node.is_null() || node == self.head || node == self.tail {
            return;
        }
        // SAFETY: node is a live entry of this list per the caller contract
        unsafe {
            if (*self.head).next == node {
                return;
            }
            self.detach(node);
            self.attach_front(node);
        }
    }

    /// Gets an immutable reference to the value stored in the entry.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `node` is either null, a sentinel, or a
    /// valid pointer to a node currently in this list. The returned borrow
    /// must end before the node is removed.
    pub unsafe fn get_value(&self, node: *mut Entry<T>) -> Option<&T> {
        if node.is_null() || node == self.head || node == self.tail {
            None
        } else {
            // SAFETY: non-sentinel nodes in the list always hold an
            // initialized value
            unsafe { Some((*node).val.assume_init_ref()) }
        }
    }

    /// Gets a mutable reference to the value stored in the entry.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `node` is either null, a sentinel, or a
    /// valid pointer to a node currently in this list. The returned borrow
    /// must end before the node is removed.
    pub unsafe fn get_value_mut(&mut self, node: *mut Entry<T>) -> Option<&mut T> {
        if node.is_null() || node == self.head || node == self.tail {
            None
        } else {
            // SAFETY: non-sentinel nodes in the list always hold an
            // initialized value
            unsafe { Some((*node).val.assume_init_mut()) }
        }
    }

    /// Clears the list, removing and dropping all entries.
    pub fn clear(&mut self) {
        while self.pop_back().is_some() {}
    }

    /// Detaches a node from the list without deallocating it.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `node` is a valid pointer to a node in the
    /// list (not null, not freed, and actually part of this list).
    unsafe fn detach(&mut self, node: *mut Entry<T>) {
        // SAFETY: the caller guarantees that node is a valid entry in the
        // list, which means its prev and next pointers are also valid entries
        unsafe {
            (*(*node).prev).next = (*node).next;
            (*(*node).next).prev = (*node).prev;
        }
    }

    /// Attaches a node after the head sentinel node.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `node` is a valid pointer to a node that
    /// is not currently linked into any list (newly allocated or detached).
    unsafe fn attach_front(&mut self, node: *mut Entry<T>) {
        // SAFETY: head is a valid pointer initialized in `new`, and the
        // caller guarantees that node is a valid unlinked entry
        unsafe {
            (*node).next = (*self.head).next;
            (*node).prev = self.head;
            (*self.head).next = node;
            (*(*node).next).prev = node;
        }
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        List::new()
    }
}

impl<T> Drop for List<T> {
    fn drop(&mut self) {
        self.clear();

        // SAFETY: head and tail are valid pointers initialized in `new` and
        // never freed before this point
        unsafe {
            if !self.head.is_null() {
                let _ = Box::from_raw(self.head);
                self.head = ptr::null_mut();
            }
            if !self.tail.is_null() {
                let _ = Box::from_raw(self.tail);
                self.tail = ptr::null_mut();
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List").field("length", &self.len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_list() {
        let list = List::<u32>::new();
        assert_eq!(list.len(), 0);
        assert!(list.is_empty());
        assert!(!list.head.is_null());
        assert!(!list.tail.is_null());
    }

    #[test]
    fn test_push_and_pop_order() {
        let mut list = List::<u32>::new();
        list.push_front(10);
        list.push_front(20);
        list.push_front(30);
        assert_eq!(list.len(), 3);

        // pop_back yields least recently pushed first
        assert_eq!(list.pop_back(), Some(10));
        assert_eq!(list.pop_back(), Some(20));
        assert_eq!(list.pop_back(), Some(30));
        assert_eq!(list.pop_back(), None);
        assert!(list.is_empty());
    }

    #[test]
    fn test_move_to_front() {
        let mut list = List::<u32>::new();

        // front -> 30 -> 20 -> 10 -> back
        let node1 = list.push_front(10);
        let _node2 = list.push_front(20);
        let node3 = list.push_front(30);

        // Move the last item (10) to front: front -> 10 -> 30 -> 20 -> back
        unsafe {
            list.move_to_front(node1);
        }
        assert_eq!(list.len(), 3);

        // Moving the current front is a no-op
        unsafe {
            list.move_to_front(node1);
        }
        assert_eq!(list.len(), 3);

        assert_eq!(list.pop_back(), Some(20));
        assert_eq!(list.pop_back(), Some(30));
        assert_eq!(list.pop_back(), Some(10));

        // node3 was freed by pop_back above; only null is safe to pass now
        let _ = node3;
        unsafe {
            list.move_to_front(ptr::null_mut());
        }
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_node() {
        let mut list = List::<u32>::new();
        let _node1 = list.push_front(10);
        let node2 = list.push_front(20);
        let _node3 = list.push_front(30);

        let removed = unsafe { list.remove(node2) };
        assert_eq!(removed, Some(20));
        assert_eq!(list.len(), 2);

        assert_eq!(list.pop_back(), Some(10));
        assert_eq!(list.pop_back(), Some(30));
    }

    #[test]
    fn test_remove_rejects_null_and_sentinels() {
        let mut list = List::<u32>::new();
        list.push_front(1);

        assert_eq!(unsafe { list.remove(ptr::null_mut()) }, None);
        let head = list.head;
        let tail = list.tail;
        assert_eq!(unsafe { list.remove(head) }, None);
        assert_eq!(unsafe { list.remove(tail) }, None);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_get_value() {
        let mut list = List::<String>::new();
        let node = list.push_front(String::from("test"));

        unsafe {
            let value = list.get_value(node).unwrap();
            assert_eq!(value, "test");

            let value_mut = list.get_value_mut(node).unwrap();
            value_mut.push_str("_modified");

            let value_after = list.get_value(node).unwrap();
            assert_eq!(value_after, "test_modified");
        }

        assert_eq!(unsafe { list.get_value(ptr::null_mut()) }, None);
    }

    #[test]
    fn test_clear_and_reuse() {
        let mut list = List::<u32>::new();
        list.push_front(10);
        list.push_front(20);
        list.push_front(30);
        assert_eq!(list.len(), 3);

        list.clear();
        assert_eq!(list.len(), 0);
        assert!(list.is_empty());

        list.push_front(40);
        assert_eq!(list.len(), 1);
        assert_eq!(list.pop_back(), Some(40));
    }

    struct ComplexValue {
        a: u32,
        b: String,
    }

    #[test]
    fn test_complex_values() {
        let mut list = List::<ComplexValue>::new();
        let node = list.push_front(ComplexValue {
            a: 1,
            b: String::from("one"),
        });
        list.push_front(ComplexValue {
            a: 2,
            b: String::from("two"),
        });

        unsafe {
            let value = list.get_value_mut(node).unwrap();
            value.a = 3;
            value.b.push_str("_modified");
        }

        let back = list.pop_back().unwrap();
        assert_eq!(back.a, 3);
        assert_eq!(back.b, "one_modified");

        let front = list.pop_back().unwrap();
        assert_eq!(front.a, 2);
        assert_eq!(front.b, "two");
    }
}
