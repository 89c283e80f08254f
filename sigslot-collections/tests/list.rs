//! End-to-end behaviour of `IntrusiveList` with elements living on the stack.

use core::pin::{Pin, pin};
use core::ptr::NonNull;

use sigslot_collections::{IntrusiveList, Link, Linked, impl_linked};

#[repr(C)]
struct Intruded {
    i: i32,
    // not the first field, so the offset is non-zero
    link: Link,
}

impl Intruded {
    const fn new(i: i32) -> Self {
        Self {
            i,
            link: Link::new(),
        }
    }
}

impl_linked!(Intruded, link);

fn link(node: Pin<&Intruded>) -> NonNull<Link> {
    Intruded::link_of(NonNull::from(node.get_ref()))
}

fn collect(list: &IntrusiveList<Intruded>) -> Vec<i32> {
    unsafe { list.iter() }.map(|n| n.i).collect()
}

#[test]
fn empty_list_is_harmless() {
    let list = pin!(IntrusiveList::<Intruded>::new());
    let list = list.into_ref();

    assert!(list.is_empty());
    list.clear();
    assert!(list.is_empty());
    assert!(collect(&list).is_empty());
}

#[test]
fn link_offset_is_not_zero() {
    assert_ne!(Intruded::LINK_OFFSET, 0);
    assert_eq!(Intruded::LINK_OFFSET, core::mem::offset_of!(Intruded, link));
}

#[test]
fn owner_recovery_past_leading_field() {
    let node = pin!(Intruded::new(-4));
    let node = node.into_ref();
    let link = link(node);

    assert_eq!(
        link.as_ptr() as usize - core::ptr::from_ref(node.get_ref()) as usize,
        Intruded::LINK_OFFSET
    );
    let owner = unsafe { Intruded::from_link(link) };
    assert!(core::ptr::eq(owner.as_ptr(), node.get_ref()));
    assert_eq!(unsafe { owner.as_ref() }.i, -4);
}

#[test]
fn nothing_linked_before_push() {
    let i0 = Intruded::new(0);
    let i1 = Intruded::new(1);

    assert!(!i0.link.is_linked());
    assert!(!i1.link.is_linked());
}

#[test]
fn push_back_links_and_preserves_order() {
    let list = pin!(IntrusiveList::<Intruded>::new());
    let list = list.into_ref();
    let i0 = pin!(Intruded::new(0));
    let i1 = pin!(Intruded::new(1));
    let i2 = pin!(Intruded::new(2));
    let i3 = pin!(Intruded::new(3));

    for node in [i0.as_ref(), i1.as_ref(), i2.as_ref(), i3.as_ref()] {
        list.push_back(node);
    }

    assert!([&i0, &i1, &i2, &i3].iter().all(|n| n.link.is_linked()));
    assert_eq!(collect(&list), [0, 1, 2, 3]);
    assert_eq!(
        unsafe { list.iter() }.rev().map(|n| n.i).collect::<Vec<_>>(),
        [3, 2, 1, 0]
    );
}

#[test]
fn clear_resets_everything() {
    let list = pin!(IntrusiveList::<Intruded>::new());
    let list = list.into_ref();
    let i0 = pin!(Intruded::new(0));
    let i1 = pin!(Intruded::new(1));
    let i2 = pin!(Intruded::new(2));
    let i3 = pin!(Intruded::new(3));

    for node in [i0.as_ref(), i1.as_ref(), i2.as_ref(), i3.as_ref()] {
        list.push_back(node);
    }
    assert!(!list.is_empty());

    list.clear();

    assert!(list.is_empty());
    assert!([&i0, &i1, &i2, &i3].iter().all(|n| !n.link.is_linked()));
    assert!(collect(&list).is_empty());
}

#[test]
fn pairwise_swaps_exchange_positions() {
    let list = pin!(IntrusiveList::<Intruded>::new());
    let list = list.into_ref();
    let i0 = pin!(Intruded::new(0));
    let i1 = pin!(Intruded::new(1));
    let i2 = pin!(Intruded::new(2));
    let i3 = pin!(Intruded::new(3));

    for node in [i0.as_ref(), i1.as_ref(), i2.as_ref(), i3.as_ref()] {
        list.push_back(node);
    }

    unsafe {
        Link::swap(link(i0.as_ref()), link(i1.as_ref()));
        Link::swap(link(i2.as_ref()), link(i3.as_ref()));
    }

    assert_eq!(collect(&list), [1, 0, 3, 2]);
    // payloads stay put
    assert_eq!((i0.i, i1.i, i2.i, i3.i), (0, 1, 2, 3));
}

#[test]
fn relocated_element_keeps_its_place() {
    let list = pin!(IntrusiveList::<Intruded>::new());
    let list = list.into_ref();
    let i0 = pin!(Intruded::new(0));
    let i1 = pin!(Intruded::new(1));
    let i2 = pin!(Intruded::new(2));

    for node in [i0.as_ref(), i1.as_ref(), i2.as_ref()] {
        list.push_back(node);
    }

    let moved = pin!(Intruded::new(10));
    unsafe { Link::relocate_from(link(moved.as_ref()), &i1.link) };

    assert!(!i1.link.is_linked());
    assert_eq!(collect(&list), [0, 10, 2]);
}

#[test]
fn elements_outliving_list_end_unlinked() {
    let i0 = pin!(Intruded::new(0));
    let i1 = pin!(Intruded::new(1));
    {
        let list = pin!(IntrusiveList::<Intruded>::new());
        let list = list.into_ref();
        list.push_back(i0.as_ref());
        list.push_back(i1.as_ref());
    }

    assert!(!i0.link.is_linked());
    assert!(!i1.link.is_linked());
}

#[test]
fn owner_recovery_through_sentinel() {
    let list = pin!(IntrusiveList::<Intruded>::new());
    let list = list.into_ref();
    let i0 = pin!(Intruded::new(7));
    list.push_back(i0.as_ref());

    let first = list.sentinel().next();
    let owner = unsafe { Intruded::from_link(first) };

    assert!(core::ptr::eq(owner.as_ptr(), &*i0));
    assert_eq!(unsafe { owner.as_ref() }.i, 7);
}
