mod common;
mod hierarchy;

pub use hierarchy::{
    DndHierarchy, DndHierarchyEntry, DndHierarchyEvent, DndHierarchyIndicatorCap,
    DndHierarchyIndicatorStyle, DndHierarchyRowState, DndHierarchyState, dnd_hierarchy,
};
