use std::sync::Arc;

use nabu_engine::host::{FieldValue, HostError, NativeBridge, NativeKind};

use super::NativeComponent;
use crate::collection::{ItemTemplate, NativeMirror, TemplatableCollection};
use crate::error::CollectionError;
use crate::source::ObservableList;

/// Geometry of one mesh item, in the mesh's local coordinates.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MeshShape {
    Rect { x: f32, y: f32, w: f32, h: f32 },
    RoundedRect { x: f32, y: f32, w: f32, h: f32, radius: f32 },
    Circle { cx: f32, cy: f32, r: f32 },
}

impl MeshShape {
    fn kind(&self) -> &'static str {
        match self {
            MeshShape::Rect { .. } => "rect",
            MeshShape::RoundedRect { .. } => "rounded_rect",
            MeshShape::Circle { .. } => "circle",
        }
    }

    fn params(&self) -> Vec<f32> {
        match *self {
            MeshShape::Rect { x, y, w, h } => vec![x, y, w, h],
            MeshShape::RoundedRect { x, y, w, h, radius } => vec![x, y, w, h, radius],
            MeshShape::Circle { cx, cy, r } => vec![cx, cy, r],
        }
    }
}

/// One filled shape of a [`UiMesh`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MeshItem {
    pub shape: MeshShape,
    /// Straight (non-premultiplied) RGBA.
    pub color: [f32; 4],
}

impl MeshItem {
    pub fn new(shape: MeshShape, color: [f32; 4]) -> Self {
        Self { shape, color }
    }

    fn to_field(&self) -> FieldValue {
        FieldValue::record([
            ("shape", FieldValue::from(self.shape.kind())),
            ("params", FieldValue::from(self.shape.params())),
            ("color", FieldValue::from(self.color.to_vec())),
        ])
    }
}

/// A native mesh drawing a list of [`MeshItem`]s.
///
/// After every change the `items` field is rewritten and the mesh is marked
/// dirty so the host regenerates its geometry.
pub struct UiMesh<S = MeshItem> {
    native: NativeComponent,
    items: TemplatableCollection<MeshItem, S, FieldValue>,
    mirror: NativeMirror<FieldValue>,
}

impl<S> UiMesh<S>
where
    MeshItem: From<S>,
    S: Clone + Send + 'static,
{
    pub fn new(bridge: &NativeBridge) -> Result<Self, HostError> {
        let native = NativeComponent::create(bridge, NativeKind::MESH)?;
        let items = TemplatableCollection::with_projection(MeshItem::to_field);
        let mirror = items.mirror_with(bridge.dispatcher(), Some(native.list_writer("items", true)));
        Ok(Self { native, items, mirror })
    }

    #[inline]
    pub fn items(&self) -> &TemplatableCollection<MeshItem, S, FieldValue> {
        &self.items
    }

    #[inline]
    pub fn mirror(&self) -> &NativeMirror<FieldValue> {
        &self.mirror
    }

    #[inline]
    pub fn native(&self) -> &NativeComponent {
        &self.native
    }

    pub fn push(&self, item: impl Into<Arc<MeshItem>>) -> Result<(), CollectionError> {
        self.items.push(item)
    }

    pub fn set_items_source(&self, source: Option<&ObservableList<S>>) -> Result<(), CollectionError> {
        self.items.change_source(source)
    }

    pub fn set_item_template(&self, template: Option<ItemTemplate<S, MeshItem>>) -> Result<(), CollectionError> {
        self.items.change_template(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nabu_engine::dispatch::Dispatcher;
    use nabu_engine::host::MemoryHost;

    #[test]
    fn item_record_layout() {
        let item = MeshItem::new(MeshShape::Circle { cx: 1.0, cy: 2.0, r: 3.0 }, [1.0, 0.0, 0.0, 1.0]);
        let field = item.to_field();
        assert_eq!(field.get("shape").and_then(FieldValue::as_text), Some("circle"));
        assert_eq!(field.get("params").and_then(FieldValue::as_list).map(<[_]>::len), Some(3));
    }

    #[test]
    fn changes_mark_mesh_dirty() {
        // Drive the designated thread by hand.
        let (dispatcher, dispatch_loop) = Dispatcher::current();
        let host = MemoryHost::new();
        let bridge = NativeBridge::new(dispatcher, host.clone());
        let mesh = UiMesh::<MeshItem>::new(&bridge).unwrap();
        let handle = mesh.native().handle();

        mesh.push(MeshItem::new(MeshShape::Rect { x: 0.0, y: 0.0, w: 4.0, h: 4.0 }, [1.0; 4])).unwrap();
        mesh.push(MeshItem::new(MeshShape::Circle { cx: 0.0, cy: 0.0, r: 1.0 }, [0.5; 4])).unwrap();
        mesh.items().remove_at(0).unwrap();
        assert_eq!(host.dirty_count(handle), 0);

        dispatch_loop.run_pending();
        assert_eq!(host.dirty_count(handle), 3);
        let items = host.field(handle, "items").unwrap();
        assert_eq!(items.as_list().map(<[_]>::len), Some(1));
    }
}
