use super::*;

/// Path nodes on the x axis, evenly spaced and centred on the origin.
pub fn compute_path_layout(store: &GraphStore, path: &[String], config: &LayoutConfig) -> Layout {
    let nodes = layout_nodes(store, path.iter().map(String::as_str), config);
    if nodes.is_empty() {
        return Layout::empty(LayoutMode::Path);
    }
    let max_radius = nodes.iter().map(|node| node.radius).fold(0.0f32, f32::max);
    let gap = config.path.gap_factor * max_radius;
    let offset = gap * (nodes.len() - 1) as f32 / 2.0;

    let mut layout = Layout::empty(LayoutMode::Path);
    for (idx, node) in nodes.iter().enumerate() {
        layout
            .positions
            .insert(node.id.clone(), Point::new(idx as f32 * gap - offset, 0.0));
        layout.radii.insert(node.id.clone(), node.radius);
    }
    layout
}
